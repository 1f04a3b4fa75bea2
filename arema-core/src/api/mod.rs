use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::Error;
use crate::models::*;
use crate::timetable::TimetableWindow;

/// The REST API consumed by the engine.
///
/// Collection endpoints return every entity when an empty ID list is given.
#[async_trait]
pub trait ApiClient: Send + Sync + 'static {
    async fn fetch_channels(&self, channel_ids: &[ChannelId]) -> Result<Vec<Channel>, Error>;

    async fn fetch_programs(&self, program_ids: &[ProgramId])
    -> Result<Vec<ProgramDetail>, Error>;

    async fn fetch_timetable(&self, window: &TimetableWindow) -> Result<Vec<Program>, Error>;

    async fn fetch_recommended_modules(
        &self,
        reference_id: &str,
    ) -> Result<Vec<RecommendedModuleDetail>, Error>;

    async fn fetch_episode(&self, episode_id: &EpisodeId) -> Result<EpisodeDetail, Error>;

    async fn fetch_series(&self, series_id: &SeriesId) -> Result<SeriesDetail, Error>;
}

#[async_trait]
impl<T> ApiClient for Arc<T>
where
    T: ApiClient + ?Sized,
{
    async fn fetch_channels(&self, channel_ids: &[ChannelId]) -> Result<Vec<Channel>, Error> {
        (**self).fetch_channels(channel_ids).await
    }

    async fn fetch_programs(
        &self,
        program_ids: &[ProgramId],
    ) -> Result<Vec<ProgramDetail>, Error> {
        (**self).fetch_programs(program_ids).await
    }

    async fn fetch_timetable(&self, window: &TimetableWindow) -> Result<Vec<Program>, Error> {
        (**self).fetch_timetable(window).await
    }

    async fn fetch_recommended_modules(
        &self,
        reference_id: &str,
    ) -> Result<Vec<RecommendedModuleDetail>, Error> {
        (**self).fetch_recommended_modules(reference_id).await
    }

    async fn fetch_episode(&self, episode_id: &EpisodeId) -> Result<EpisodeDetail, Error> {
        (**self).fetch_episode(episode_id).await
    }

    async fn fetch_series(&self, series_id: &SeriesId) -> Result<SeriesDetail, Error> {
        (**self).fetch_series(series_id).await
    }
}

/// An `ApiClient` over HTTP.
#[derive(Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpApiClient {
    pub fn new(config: &Config) -> Self {
        HttpApiClient {
            client: reqwest::Client::new(),
            base_url: config.api.base_url.clone(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::UrlError(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn endpoint_with_ids<'a, I>(&self, segment: &str, key: &str, mut ids: I) -> Result<Url, Error>
    where
        I: ExactSizeIterator<Item = &'a str>,
    {
        let mut url = self.endpoint(&[segment])?;
        if ids.len() > 0 {
            url.query_pairs_mut().append_pair(key, &ids.join(","));
        }
        Ok(url)
    }

    async fn get<T>(&self, url: Url, not_found: Option<Error>) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(%url, "GET");
        let res = self.client.get(url).send().await?;
        match (res.status(), not_found) {
            (status, _) if status.is_success() => Ok(res.json::<T>().await?),
            (StatusCode::UNAUTHORIZED, _) => Err(Error::Unauthorized),
            (StatusCode::NOT_FOUND, Some(err)) => Err(err),
            (status, _) => Err(Error::UnexpectedStatus(status)),
        }
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn fetch_channels(&self, channel_ids: &[ChannelId]) -> Result<Vec<Channel>, Error> {
        let url = self.endpoint_with_ids(
            "channels",
            "channelIds",
            channel_ids.iter().map(ChannelId::as_str),
        )?;
        self.get(url, None).await
    }

    async fn fetch_programs(
        &self,
        program_ids: &[ProgramId],
    ) -> Result<Vec<ProgramDetail>, Error> {
        let url = self.endpoint_with_ids(
            "programs",
            "programIds",
            program_ids.iter().map(ProgramId::as_str),
        )?;
        self.get(url, None).await
    }

    async fn fetch_timetable(&self, window: &TimetableWindow) -> Result<Vec<Program>, Error> {
        let mut url = self.endpoint(&["timetable"])?;
        url.query_pairs_mut()
            .append_pair("since", &window.since_param())
            .append_pair("until", &window.until_param());
        self.get(url, None).await
    }

    async fn fetch_recommended_modules(
        &self,
        reference_id: &str,
    ) -> Result<Vec<RecommendedModuleDetail>, Error> {
        let url = self.endpoint(&["recommended", reference_id])?;
        self.get(url, None).await
    }

    async fn fetch_episode(&self, episode_id: &EpisodeId) -> Result<EpisodeDetail, Error> {
        let url = self.endpoint(&["episodes", episode_id.as_str()])?;
        self.get(url, Some(Error::EpisodeNotFound)).await
    }

    async fn fetch_series(&self, series_id: &SeriesId) -> Result<SeriesDetail, Error> {
        let url = self.endpoint(&["series", series_id.as_str()])?;
        self.get(url, Some(Error::SeriesNotFound)).await
    }
}


#[cfg(test)]
pub(crate) mod stub;
// </coverage:exclude>
