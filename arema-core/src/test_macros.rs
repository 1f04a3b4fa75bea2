macro_rules! channel {
    ($id:expr) => {
        crate::models::Channel {
            id: $id.into(),
            name: format!("{}", $id),
            logo_url: "".to_string(),
        }
    };
}

// Times are UNIX times in milliseconds.
macro_rules! program {
    ($id:expr, $channel_id:expr, $start_ms:expr, $end_ms:expr) => {
        crate::models::Program {
            id: $id.into(),
            channel_id: $channel_id.into(),
            title: format!("{}", $id),
            description: "".to_string(),
            thumbnail_url: "".to_string(),
            start_at: chrono_jst::Jst::from_unixtime_ms($start_ms).unwrap(),
            end_at: chrono_jst::Jst::from_unixtime_ms($end_ms).unwrap(),
            episode_id: None,
        }
    };
}
