/// The width of a frame in the seek thumbnail sprite, in px.
///
/// The sprite has one frame per second of the media.
pub const SEEK_THUMBNAIL_WIDTH: f64 = 160.0;

/// Placement of the seek thumbnail shown above the seek bar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeekThumbnail {
    /// The time pointed on the seek bar, in seconds.
    pub pointed_time: f64,
    /// The horizontal offset of the sprite, in px.
    pub background_position_x: f64,
    /// The center of the thumbnail relative to the seek bar, in px.
    pub left: f64,
}

impl SeekThumbnail {
    /// Computes the placement for a pointer at `pointer_x`.
    ///
    /// `bar_left` and `bar_width` are the geometry of the seek bar, and
    /// `duration` is the length of the media in seconds.  The thumbnail is
    /// kept inside the bar as long as the bar is wider than the thumbnail.
    pub fn new(pointer_x: f64, bar_left: f64, bar_width: f64, duration: f64) -> Self {
        let relative_x = pointer_x - bar_left;
        let percentage = if bar_width > 0.0 {
            (relative_x / bar_width).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let pointed_time = duration.max(0.0) * percentage;

        let min_left = SEEK_THUMBNAIL_WIDTH / 2.0;
        let max_left = bar_width - SEEK_THUMBNAIL_WIDTH / 2.0;
        // Not `clamp()`, which panics when the bar is narrower than the
        // thumbnail.
        let left = min_left.max(relative_x.min(max_left));

        SeekThumbnail {
            pointed_time,
            background_position_x: -SEEK_THUMBNAIL_WIDTH * pointed_time.floor(),
            left,
        }
    }
}

/// Formats a playback position in seconds as `mm:ss`.
///
/// Minutes are not wrapped into hours.
pub fn format_playback_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    };
    let minutes = (seconds / 60.0).floor() as u64;
    let remaining = (seconds % 60.0).floor() as u64;
    format!("{minutes:02}:{remaining:02}")
}

// <coverage:exclude>
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_seek_thumbnail() {
        // 25% of a 600 sec media.
        let thumbnail = SeekThumbnail::new(250.0, 100.0, 600.0, 600.0);
        assert_eq!(
            thumbnail,
            SeekThumbnail {
                pointed_time: 150.0,
                background_position_x: -160.0 * 150.0,
                left: 150.0,
            }
        );

        let thumbnail = SeekThumbnail::new(164.0, 100.0, 512.0, 10.0);
        assert_eq!(thumbnail.pointed_time, 1.25);
        assert_eq!(thumbnail.background_position_x, -160.0);
        assert_eq!(thumbnail.left, 80.0);
    }

    #[test]
    fn test_seek_thumbnail_edges() {
        // Left of the bar.
        let thumbnail = SeekThumbnail::new(0.0, 100.0, 600.0, 600.0);
        assert_eq!(thumbnail.pointed_time, 0.0);
        assert_eq!(thumbnail.background_position_x, 0.0);
        assert_eq!(thumbnail.left, 80.0);

        // Right of the bar.
        let thumbnail = SeekThumbnail::new(1000.0, 100.0, 600.0, 600.0);
        assert_eq!(thumbnail.pointed_time, 600.0);
        assert_eq!(thumbnail.left, 520.0);

        // Near the right end.
        let thumbnail = SeekThumbnail::new(650.0, 100.0, 600.0, 600.0);
        assert_eq!(thumbnail.left, 520.0);
    }

    #[test]
    fn test_seek_thumbnail_narrow_bar() {
        let thumbnail = SeekThumbnail::new(50.0, 0.0, 100.0, 60.0);
        assert_eq!(thumbnail.pointed_time, 30.0);
        assert_eq!(thumbnail.left, 80.0);

        let thumbnail = SeekThumbnail::new(50.0, 0.0, 0.0, 60.0);
        assert_eq!(thumbnail.pointed_time, 0.0);
        assert_eq!(thumbnail.left, 80.0);
    }

    #[test]
    fn test_format_playback_time() {
        assert_eq!(format_playback_time(0.0), "00:00");
        assert_eq!(format_playback_time(5.9), "00:05");
        assert_eq!(format_playback_time(65.0), "01:05");
        assert_eq!(format_playback_time(3599.99), "59:59");
        assert_eq!(format_playback_time(7200.0), "120:00");
        assert_eq!(format_playback_time(-1.0), "00:00");
        assert_eq!(format_playback_time(f64::NAN), "00:00");
    }
}
// </coverage:exclude>
