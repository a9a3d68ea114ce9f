//! Phase 1: ASSETS_SEARCHED
//!
//! Looks up one background image and one background clip. Entirely optional:
//! an unavailable asset only means a solid-color video later.

use super::{JobContext, JobOrchestrator};
use crate::error::PipelineResult;
use crate::models::{AssetOutcome, JobState};
use crate::services::asset_search::{find_asset, AssetType};
use rand::rngs::StdRng;
use rand::SeedableRng;

impl JobOrchestrator {
    pub(super) async fn phase_assets(&self, ctx: &mut JobContext) -> PipelineResult<()> {
        ctx.stage = "asset_search";
        let query = ctx.record.request.asset_query();
        let search = self.providers.asset_search.as_deref();
        let mut rng = StdRng::from_entropy();

        ctx.image = find_asset(search, AssetType::Image, &query, &mut rng).await;
        ctx.video = find_asset(search, AssetType::Video, &query, &mut rng).await;

        for (label, outcome) in [("image_search", &ctx.image), ("video_search", &ctx.video)] {
            if let AssetOutcome::Unavailable(reason) = outcome {
                self.note_fallback(&mut ctx.record, label, reason);
            }
        }

        tracing::debug!(
            job_id = %ctx.record.job_id,
            image = ctx.image.log_value(),
            video = ctx.video.log_value(),
            "Background assets"
        );

        self.advance(&mut ctx.record, JobState::AssetsSearched).await;
        Ok(())
    }
}
