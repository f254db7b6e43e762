use std::{io::stdout, time::Duration};

use crate::countdown::PromptLabel;
use crate::gui::error::SenseGuiError;

use crossterm::{
    event::{self, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{
        block::{Position, Title},
        *,
    },
    Terminal,
};

/// Full-screen fire prompt for a running session.
///
/// Re-reads the label and the status line through the supplied closures on
/// every poll interval (the countdown's own tick cadence) and redraws.
/// Returns when the operator presses any key, which is how a session is
/// stopped interactively.
pub fn prompt_view(
    mut label: Box<dyn FnMut() -> PromptLabel>,
    mut status: Box<dyn FnMut() -> String>,
) -> Result<(), SenseGuiError> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    loop {
        let current = label();
        let status_line = status();

        let title = Title::from(" SensExp ".cyan().bold());
        let instructions = Title::from(Line::from(vec![
            " Stop ".into(),
            "<Any Key> ".cyan().bold(),
        ]));
        let block = Block::default()
            .title(title.alignment(Alignment::Center))
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL);

        let prompt_line = match current {
            PromptLabel::FireNow => Line::from("fire now".red().bold()),
            PromptLabel::FireIn(_) => Line::from(current.to_string().yellow()),
            PromptLabel::Hidden => Line::from(""),
        };
        let body = Paragraph::new(vec![
            Line::from(""),
            prompt_line,
            Line::from(""),
            Line::from(status_line.dim()),
        ])
        .alignment(Alignment::Center)
        .block(block);

        terminal.draw(|frame| {
            let area = frame.size();
            frame.render_widget(body, area);
        })?;

        if event::poll(Duration::from_millis(100))? {
            if let event::Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    break;
                }
            }
        }
    }

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
