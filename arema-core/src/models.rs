use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono_jst::Jst;
use serde::Deserialize;
use serde::Serialize;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(ChannelId, "CH");
define_id!(ProgramId, "PG");
define_id!(EpisodeId, "EP");
define_id!(SeriesId, "SR");
define_id!(ModuleId, "MD");
define_id!(ItemId, "IT");

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub logo_url: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: ProgramId,
    pub channel_id: ChannelId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(with = "chrono_jst::serde::rfc3339")]
    pub start_at: DateTime<Jst>,
    #[serde(with = "chrono_jst::serde::rfc3339")]
    pub end_at: DateTime<Jst>,
    #[serde(default)]
    pub episode_id: Option<EpisodeId>,
}

impl Program {
    pub fn duration(&self) -> Duration {
        self.end_at - self.start_at
    }

    pub fn start_at_ms(&self) -> i64 {
        self.start_at.timestamp_millis()
    }

    pub fn end_at_ms(&self) -> i64 {
        self.end_at.timestamp_millis()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: EpisodeId,
    pub series_id: SeriesId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: String,
    pub order: i64,
    pub stream_id: String,
    #[serde(default)]
    pub premium: bool,
}

/// A series and its episodes in ascending `order`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub id: SeriesId,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub episode_ids: Vec<EpisodeId>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedModule {
    pub id: ModuleId,
    pub order: i64,
    pub title: String,
    pub module_type: String,
    /// A program ID or an episode ID which the module was fetched for.
    pub reference_id: String,
    pub items: Vec<RecommendedItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecommendedItem {
    pub id: ItemId,
    pub order: i64,
    pub target: RecommendedTarget,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum RecommendedTarget {
    Series(SeriesId),
    Episode(EpisodeId),
}

/// A bundle of normalized entities applied to the store in a single message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Entities {
    pub channels: Vec<Channel>,
    pub programs: Vec<Program>,
    pub episodes: Vec<Episode>,
    pub series: Vec<Series>,
    pub modules: Vec<RecommendedModule>,
}

impl Entities {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
            && self.programs.is_empty()
            && self.episodes.is_empty()
            && self.series.is_empty()
            && self.modules.is_empty()
    }

    pub fn with_channels(channels: Vec<Channel>) -> Self {
        Entities {
            channels,
            ..Default::default()
        }
    }

    pub fn with_programs(programs: Vec<Program>) -> Self {
        Entities {
            programs,
            ..Default::default()
        }
    }
}

// Nested API responses.
//
// The server embeds related entities; they are flattened into `Entities`
// before they reach the store.

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramDetail {
    #[serde(flatten)]
    pub program: Program,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub episode: Option<EpisodeDetail>,
}

impl ProgramDetail {
    pub fn collect(self, entities: &mut Entities) {
        if let Some(channel) = self.channel {
            entities.channels.push(channel);
        }
        if let Some(episode) = self.episode {
            episode.collect(entities);
        }
        entities.programs.push(self.program);
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeDetail {
    #[serde(flatten)]
    pub episode: Episode,
    #[serde(default)]
    pub series: Option<SeriesDetail>,
}

impl EpisodeDetail {
    pub fn collect(self, entities: &mut Entities) {
        if let Some(series) = self.series {
            series.collect(entities);
        }
        entities.episodes.push(self.episode);
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDetail {
    pub id: SeriesId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub episodes: Vec<EpisodeDetail>,
}

impl SeriesDetail {
    pub fn collect(mut self, entities: &mut Entities) {
        // Stable, so that episodes sharing the same order keep the server's
        // order.
        self.episodes.sort_by_key(|detail| detail.episode.order);
        let episode_ids = self
            .episodes
            .iter()
            .map(|detail| detail.episode.id.clone())
            .collect();
        for detail in self.episodes {
            detail.collect(entities);
        }
        entities.series.push(Series {
            id: self.id,
            title: self.title,
            description: self.description,
            thumbnail_url: self.thumbnail_url,
            episode_ids,
        });
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedModuleDetail {
    pub id: ModuleId,
    pub order: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub module_type: String,
    pub reference_id: String,
    #[serde(default)]
    pub items: Vec<RecommendedItemDetail>,
}

impl RecommendedModuleDetail {
    pub fn collect(self, entities: &mut Entities) {
        let mut items = Vec::with_capacity(self.items.len());
        for item in self.items {
            let target = match (item.series, item.episode) {
                (Some(series), _) => {
                    let target = RecommendedTarget::Series(series.id.clone());
                    series.collect(entities);
                    target
                }
                (None, Some(episode)) => {
                    let target = RecommendedTarget::Episode(episode.episode.id.clone());
                    episode.collect(entities);
                    target
                }
                (None, None) => {
                    tracing::warn!(module.id = %self.id, item.id = %item.id, "No target, skip");
                    continue;
                }
            };
            items.push(RecommendedItem {
                id: item.id,
                order: item.order,
                target,
            });
        }
        entities.modules.push(RecommendedModule {
            id: self.id,
            order: self.order,
            title: self.title,
            module_type: self.module_type,
            reference_id: self.reference_id,
            items,
        });
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedItemDetail {
    pub id: ItemId,
    pub order: i64,
    #[serde(default)]
    pub series: Option<SeriesDetail>,
    #[serde(default)]
    pub episode: Option<EpisodeDetail>,
}

// <coverage:exclude>
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_id_display() {
        assert_eq!(ProgramId::from("p1").to_string(), "PG#p1");
        assert_eq!(ChannelId::from("news").to_string(), "CH#news");
        assert_eq!(EpisodeId::from("e1").as_str(), "e1");
    }

    #[test]
    fn test_program_deserialize() {
        let program: Program = serde_json::from_str(
            r#"{
                "id": "p1",
                "channelId": "news",
                "title": "Morning",
                "description": "",
                "thumbnailUrl": "/images/p1.jpeg",
                "startAt": "2024-01-15T00:00:00.000Z",
                "endAt": "2024-01-15T00:30:00.000Z",
                "episodeId": "e1"
            }"#,
        )
        .unwrap();
        assert_eq!(program.id, ProgramId::from("p1"));
        assert_eq!(program.channel_id, ChannelId::from("news"));
        assert_eq!(program.start_at.to_rfc3339(), "2024-01-15T09:00:00+09:00");
        assert_eq!(program.duration(), Duration::minutes(30));
        assert_eq!(program.episode_id, Some(EpisodeId::from("e1")));
    }

    #[test]
    fn test_program_detail_collect() {
        let detail: ProgramDetail = serde_json::from_str(
            r#"{
                "id": "p1",
                "channelId": "news",
                "title": "Morning",
                "startAt": "2024-01-15T00:00:00.000Z",
                "endAt": "2024-01-15T00:30:00.000Z",
                "episodeId": "e2",
                "channel": {"id": "news", "name": "News", "logoUrl": "/logos/news.svg"},
                "episode": {
                    "id": "e2",
                    "seriesId": "s1",
                    "title": "Episode 2",
                    "order": 2,
                    "streamId": "st2",
                    "series": {
                        "id": "s1",
                        "title": "Series",
                        "episodes": [
                            {"id": "e2", "seriesId": "s1", "title": "Episode 2", "order": 2, "streamId": "st2"},
                            {"id": "e1", "seriesId": "s1", "title": "Episode 1", "order": 1, "streamId": "st1"}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();

        let mut entities = Entities::default();
        detail.collect(&mut entities);

        assert_eq!(entities.channels.len(), 1);
        assert_eq!(entities.programs.len(), 1);
        assert_eq!(entities.series.len(), 1);
        assert_eq!(
            entities.series[0].episode_ids,
            vec![EpisodeId::from("e1"), EpisodeId::from("e2")]
        );
        // e1 and e2 from the series, then e2 itself.
        assert_eq!(entities.episodes.len(), 3);
        assert!(entities.modules.is_empty());
    }

    #[test]
    fn test_recommended_module_detail_collect() {
        let detail: RecommendedModuleDetail = serde_json::from_str(
            r#"{
                "id": "m1",
                "order": 1,
                "title": "Pickup",
                "type": "carousel",
                "referenceId": "p1",
                "items": [
                    {"id": "i1", "order": 1, "series": {"id": "s1", "title": "Series", "episodes": []}},
                    {"id": "i2", "order": 2, "episode": {"id": "e1", "seriesId": "s1", "title": "Episode 1", "order": 1, "streamId": "st1"}},
                    {"id": "i3", "order": 3}
                ]
            }"#,
        )
        .unwrap();

        let mut entities = Entities::default();
        detail.collect(&mut entities);

        assert_eq!(entities.modules.len(), 1);
        let module = &entities.modules[0];
        assert_eq!(module.module_type, "carousel");
        assert_eq!(module.reference_id, "p1");
        assert_eq!(
            module.items,
            vec![
                RecommendedItem {
                    id: "i1".into(),
                    order: 1,
                    target: RecommendedTarget::Series("s1".into()),
                },
                RecommendedItem {
                    id: "i2".into(),
                    order: 2,
                    target: RecommendedTarget::Episode("e1".into()),
                },
            ]
        );
        assert_eq!(entities.series.len(), 1);
        assert_eq!(entities.episodes.len(), 1);
    }
}
// </coverage:exclude>
