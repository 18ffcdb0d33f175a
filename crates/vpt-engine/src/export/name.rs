use time::macros::format_description;
use time::OffsetDateTime;

use super::OutputKind;

/// Timestamped default name for an export started at `now` (UTC):
/// `Y_M_D_h_m_s` for an image directory, with `.gif` appended for video.
pub fn suggested_export_name(kind: OutputKind, now: OffsetDateTime) -> String {
    let format = format_description!(
        "[year]_[month padding:none]_[day padding:none]_[hour padding:none]_[minute padding:none]_[second padding:none]"
    );
    let stamp = now
        .to_offset(time::UtcOffset::UTC)
        .format(&format)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    match kind {
        OutputKind::Images => stamp,
        OutputKind::Video => format!("{stamp}.gif"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn names_use_unpadded_utc_fields() {
        let now = datetime!(2024-03-07 09:05:01 UTC);
        assert_eq!(suggested_export_name(OutputKind::Images, now), "2024_3_7_9_5_1");
        assert_eq!(suggested_export_name(OutputKind::Video, now), "2024_3_7_9_5_1.gif");
    }
}
