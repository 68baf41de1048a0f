use std::path::Path;

use tabled::Table;

use crate::{
    management::read_published,
    types::{PlaybackState, StatusTableRow},
    utils, warning,
};

/// Prints the last published status as a table.
pub async fn status(path: &Path) {
    match read_published(path).await {
        Ok(state) => {
            println!("{}", Table::new(status_rows(&state)));
            println!("{}", path.display());
        }
        Err(e) => warning!(
            "No status published at {} yet. Run vodsync first.\n Error: {}",
            path.display(),
            e
        ),
    }
}

pub fn status_rows(state: &PlaybackState) -> Vec<StatusTableRow> {
    let none = || "-".to_string();

    vec![
        StatusTableRow {
            field: "state".to_string(),
            value: if state.is_playing { "playing" } else { "paused" }.to_string(),
        },
        StatusTableRow {
            field: "title".to_string(),
            value: state.title.clone().unwrap_or_else(none),
        },
        StatusTableRow {
            field: "artist".to_string(),
            value: state.artist.clone().unwrap_or_else(none),
        },
        StatusTableRow {
            field: "track id".to_string(),
            value: state.track_id.clone().unwrap_or_else(none),
        },
        StatusTableRow {
            field: "progress".to_string(),
            value: format!(
                "{} / {}",
                utils::format_ms(state.progress_ms),
                utils::format_ms(state.duration_ms)
            ),
        },
    ]
}
