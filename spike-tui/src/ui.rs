// TUI rendering: 2D spike raster (time on X, input neurons on Y) + status panel.

use std::io::Stdout;

use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::Text,
    widgets::{Block, Borders, Paragraph},
    Terminal,
};

use crate::app::App;
use crate::backend::SpikeSource;

/// Raster rows as "fNNN |....." lines, one per input feature.
pub fn raster_lines<S: SpikeSource>(app: &App<S>) -> Vec<String> {
    let label_width = app.raster.len().saturating_sub(1).to_string().len();
    app.raster
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let mut line = format!("f{:0width$} |", row_idx, width = label_width);
            line.extend(row.iter());
            line
        })
        .collect()
}

/// Draws the UI each frame:
/// - Top: spike raster of the selected sample (rows = features, columns = time, circular).
/// - Bottom: status with sample, timestep, run state and controls.
pub fn draw<S: SpikeSource>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &App<S>,
    title: &str,
) -> anyhow::Result<()> {
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Percentage(80), Constraint::Percentage(20)].as_ref())
            .split(f.size());

        let raster_text = Text::from(raster_lines(app).join("\n"));
        let raster_widget = Paragraph::new(raster_text)
            .block(
                Block::default()
                    .title(format!("Spike Raster  {}  (time →)", title))
                    .borders(Borders::ALL),
            )
            .style(Style::default().fg(Color::White));
        f.render_widget(raster_widget, chunks[0]);

        let status = format!(
            "Sample: {}/{} | Step: {} | Features: {} | Running: {} | Controls: [s] Step  [r] Run/Pause  [n]/[p] Sample  [q] Quit",
            app.source.sample() + 1,
            app.source.samples(),
            app.source.position(),
            app.source.neurons(),
            if app.running { "yes" } else { "no" }
        );
        let status_widget = Paragraph::new(status)
            .style(Style::default().fg(Color::Cyan))
            .block(Block::default().title("Status").borders(Borders::ALL));
        f.render_widget(status_widget, chunks[1]);
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TensorSource;
    use spike_core::SpikeTensor;

    #[test]
    fn labels_are_zero_padded_to_the_widest_row() {
        let tensor = SpikeTensor::from_cells(1, 1, 12, vec![1; 12]).unwrap();
        let mut app = App::new(TensorSource::new(tensor, 0), 3);
        app.step();
        let lines = raster_lines(&app);
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[3], "f03 | • ");
        assert!(lines[11].starts_with("f11 |"));
    }
}
