use actlet::prelude::*;

use crate::api::ApiClient;
use crate::batcher::FetchProgram;
use crate::error::Error;
use crate::models::*;
use crate::timetable::TimetableWindow;

/// Fetches entities for pages.
///
/// Failures are logged and reported as absence: `None` or an empty list.
/// Programs fetched by ID go through the batcher.
#[derive(Clone)]
pub struct Services<A, B> {
    api: A,
    batcher: B,
}

impl<A, B> Services<A, B>
where
    A: ApiClient,
    B: Call<FetchProgram> + Send + Sync,
{
    pub fn new(api: A, batcher: B) -> Self {
        Services { api, batcher }
    }

    pub async fn fetch_program(&self, program_id: ProgramId) -> Option<ProgramDetail> {
        let msg = FetchProgram {
            program_id: program_id.clone(),
        };
        let pending = match self.batcher.call(msg).await {
            Ok(pending) => pending,
            Err(err) => {
                tracing::error!(%err, %program_id, "Batcher unavailable");
                return None;
            }
        };
        match pending.await {
            Ok(detail) => Some(detail),
            Err(Error::ProgramNotFound) => {
                tracing::warn!(%program_id, "No such program");
                None
            }
            Err(err) => {
                tracing::error!(%err, %program_id, "Failed to fetch program");
                None
            }
        }
    }

    pub async fn fetch_programs(&self) -> Vec<ProgramDetail> {
        self.api
            .fetch_programs(&[])
            .await
            .unwrap_or_else(|err| {
                tracing::error!(%err, "Failed to fetch programs");
                vec![]
            })
    }

    pub async fn fetch_channels(&self) -> Vec<Channel> {
        self.api
            .fetch_channels(&[])
            .await
            .unwrap_or_else(|err| {
                tracing::error!(%err, "Failed to fetch channels");
                vec![]
            })
    }

    pub async fn fetch_timetable(&self, window: &TimetableWindow) -> Vec<Program> {
        self.api
            .fetch_timetable(window)
            .await
            .unwrap_or_else(|err| {
                tracing::error!(%err, since = %window.since, until = %window.until, "Failed to fetch timetable");
                vec![]
            })
    }

    pub async fn fetch_recommended_modules(
        &self,
        reference_id: &str,
    ) -> Vec<RecommendedModuleDetail> {
        self.api
            .fetch_recommended_modules(reference_id)
            .await
            .unwrap_or_else(|err| {
                tracing::error!(%err, reference_id, "Failed to fetch recommended modules");
                vec![]
            })
    }

    pub async fn fetch_episode(&self, episode_id: &EpisodeId) -> Option<EpisodeDetail> {
        match self.api.fetch_episode(episode_id).await {
            Ok(detail) => Some(detail),
            Err(Error::EpisodeNotFound) => {
                tracing::warn!(%episode_id, "No such episode");
                None
            }
            Err(err) => {
                tracing::error!(%err, %episode_id, "Failed to fetch episode");
                None
            }
        }
    }

    pub async fn fetch_series(&self, series_id: &SeriesId) -> Option<SeriesDetail> {
        match self.api.fetch_series(series_id).await {
            Ok(detail) => Some(detail),
            Err(Error::SeriesNotFound) => {
                tracing::warn!(%series_id, "No such series");
                None
            }
            Err(err) => {
                tracing::error!(%err, %series_id, "Failed to fetch series");
                None
            }
        }
    }
}

// <coverage:exclude>
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::stub::ApiClientStub;
    use crate::batcher::ProgramBatcher;
    use crate::config::Config;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use reqwest::StatusCode;
    use test_log::test;

    type Batcher = Address<ProgramBatcher<ApiClientStub>>;

    async fn spawn_batcher(system: &System, api: ApiClientStub) -> Batcher {
        system
            .spawn_actor(ProgramBatcher::new(Arc::new(Config::default()), api))
            .await
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_fetch_program() {
        let system = System::new();
        let api = ApiClientStub {
            programs: vec![program!("p1", "ch1", 0, 1000)],
            ..Default::default()
        };
        let batcher = spawn_batcher(&system, api.clone()).await;
        let services = Services::new(api, batcher);

        assert_matches!(services.fetch_program("p1".into()).await, Some(detail) => {
            assert_eq!(detail.program.id, ProgramId::from("p1"));
        });
        assert_matches!(services.fetch_program("p2".into()).await, None);

        system.shutdown().await;
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_fetch_program_failed() {
        let system = System::new();
        let api = ApiClientStub {
            programs: vec![program!("p1", "ch1", 0, 1000)],
            fail: true,
            ..Default::default()
        };
        let batcher = spawn_batcher(&system, api.clone()).await;
        let services = Services::new(api, batcher);

        assert_matches!(services.fetch_program("p1".into()).await, None);

        system.shutdown().await;
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_fetch_program_batcher_stopped() {
        let system = System::new();
        let api = ApiClientStub::default();
        let batcher = spawn_batcher(&system, api.clone()).await;
        batcher.emit(Stop).await;
        while !batcher.is_closed() {
            tokio::task::yield_now().await;
        }
        let services = Services::new(api, batcher);

        assert_matches!(services.fetch_program("p1".into()).await, None);

        system.shutdown().await;
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_fetch_lists() {
        let system = System::new();
        let batcher = spawn_batcher(&system, Default::default()).await;

        let mut api = MockApi::new();
        api.expect_fetch_channels()
            .withf(|ids| ids.is_empty())
            .returning(|_| Ok(vec![channel!("ch1")]));
        api.expect_fetch_programs()
            .returning(|_| Err(Error::UnexpectedStatus(StatusCode::BAD_GATEWAY)));
        api.expect_fetch_timetable()
            .returning(|_| Err(Error::Unauthorized));
        api.expect_fetch_recommended_modules()
            .withf(|reference_id| reference_id.to_string() == "p1")
            .returning(|_| Ok(vec![]));
        let services = Services::new(api, batcher);

        assert_eq!(services.fetch_channels().await.len(), 1);
        assert!(services.fetch_programs().await.is_empty());
        let window = TimetableWindow::for_date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert!(services.fetch_timetable(&window).await.is_empty());
        assert!(services.fetch_recommended_modules("p1").await.is_empty());

        system.shutdown().await;
    }

    #[test(tokio::test(start_paused = true))]
    async fn test_fetch_episode_and_series() {
        let system = System::new();
        let batcher = spawn_batcher(&system, Default::default()).await;

        let mut api = MockApi::new();
        api.expect_fetch_episode()
            .withf(|id| id.as_str() == "e1")
            .returning(|_| Err(Error::EpisodeNotFound));
        api.expect_fetch_episode()
            .withf(|id| id.as_str() == "e2")
            .returning(|_| Err(Error::UnexpectedStatus(StatusCode::INTERNAL_SERVER_ERROR)));
        api.expect_fetch_series()
            .returning(|_| Err(Error::SeriesNotFound));
        let services = Services::new(api, batcher);

        assert_matches!(services.fetch_episode(&"e1".into()).await, None);
        assert_matches!(services.fetch_episode(&"e2".into()).await, None);
        assert_matches!(services.fetch_series(&"s1".into()).await, None);

        system.shutdown().await;
    }

    mockall::mock! {
        Api {}

        #[async_trait]
        impl ApiClient for Api {
            async fn fetch_channels(&self, channel_ids: &[ChannelId]) -> Result<Vec<Channel>, Error>;
            async fn fetch_programs(&self, program_ids: &[ProgramId]) -> Result<Vec<ProgramDetail>, Error>;
            async fn fetch_timetable(&self, window: &TimetableWindow) -> Result<Vec<Program>, Error>;
            async fn fetch_recommended_modules(&self, reference_id: &str) -> Result<Vec<RecommendedModuleDetail>, Error>;
            async fn fetch_episode(&self, episode_id: &EpisodeId) -> Result<EpisodeDetail, Error>;
            async fn fetch_series(&self, series_id: &SeriesId) -> Result<SeriesDetail, Error>;
        }
    }
}
// </coverage:exclude>
