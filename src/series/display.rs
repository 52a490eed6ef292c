// series::display
use super::SeriesEntry;

/// Orders entries for the series-name prompt: most recently written first
/// when `sort_latest`, otherwise by key.
pub fn sort_for_display(
    mut entries: Vec<(String, SeriesEntry)>,
    sort_latest: bool,
) -> Vec<(String, SeriesEntry)> {
    if sort_latest {
        entries.sort_by(|a, b| {
            b.1.timestamp
                .total_cmp(&a.1.timestamp)
                .then_with(|| a.0.cmp(&b.0))
        });
    } else {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
    }

    entries
}

pub fn display_names(entries: Vec<(String, SeriesEntry)>, sort_latest: bool) -> Vec<String> {
    sort_for_display(entries, sort_latest)
        .into_iter()
        .map(|(k, _)| k)
        .collect()
}
