use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use super::*;

/// An in-memory `ApiClient`.
///
/// Requests of `fetch_programs()` are recorded so that tests can check how
/// fetches were batched.
#[derive(Clone, Default)]
pub(crate) struct ApiClientStub {
    pub(crate) channels: Vec<Channel>,
    pub(crate) programs: Vec<Program>,
    pub(crate) modules: Vec<RecommendedModuleDetail>,
    pub(crate) episodes: Vec<EpisodeDetail>,
    pub(crate) series: Vec<SeriesDetail>,
    pub(crate) fail: bool,
    pub(crate) delay: Option<Duration>,
    pub(crate) program_requests: Arc<Mutex<Vec<Vec<ProgramId>>>>,
}

impl ApiClientStub {
    pub(crate) fn program_requests(&self) -> Vec<Vec<ProgramId>> {
        self.program_requests.lock().unwrap().clone()
    }

    async fn respond(&self) -> Result<(), Error> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            Err(Error::UnexpectedStatus(StatusCode::INTERNAL_SERVER_ERROR))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ApiClient for ApiClientStub {
    async fn fetch_channels(&self, channel_ids: &[ChannelId]) -> Result<Vec<Channel>, Error> {
        self.respond().await?;
        Ok(self
            .channels
            .iter()
            .filter(|channel| channel_ids.is_empty() || channel_ids.contains(&channel.id))
            .cloned()
            .collect())
    }

    async fn fetch_programs(
        &self,
        program_ids: &[ProgramId],
    ) -> Result<Vec<ProgramDetail>, Error> {
        self.program_requests
            .lock()
            .unwrap()
            .push(program_ids.to_vec());
        self.respond().await?;
        Ok(self
            .programs
            .iter()
            .filter(|program| program_ids.is_empty() || program_ids.contains(&program.id))
            .map(|program| ProgramDetail {
                program: program.clone(),
                channel: self
                    .channels
                    .iter()
                    .find(|channel| channel.id == program.channel_id)
                    .cloned(),
                episode: None,
            })
            .collect())
    }

    async fn fetch_timetable(&self, window: &TimetableWindow) -> Result<Vec<Program>, Error> {
        self.respond().await?;
        Ok(self
            .programs
            .iter()
            .filter(|program| window.contains(program))
            .cloned()
            .collect())
    }

    async fn fetch_recommended_modules(
        &self,
        reference_id: &str,
    ) -> Result<Vec<RecommendedModuleDetail>, Error> {
        self.respond().await?;
        Ok(self
            .modules
            .iter()
            .filter(|module| module.reference_id == reference_id)
            .cloned()
            .collect())
    }

    async fn fetch_episode(&self, episode_id: &EpisodeId) -> Result<EpisodeDetail, Error> {
        self.respond().await?;
        self.episodes
            .iter()
            .find(|detail| detail.episode.id == *episode_id)
            .cloned()
            .ok_or(Error::EpisodeNotFound)
    }

    async fn fetch_series(&self, series_id: &SeriesId) -> Result<SeriesDetail, Error> {
        self.respond().await?;
        self.series
            .iter()
            .find(|detail| detail.id == *series_id)
            .cloned()
            .ok_or(Error::SeriesNotFound)
    }
}
