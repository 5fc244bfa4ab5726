use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text editing shared by the message box and the prompts
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(text.chars().count()),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = text.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
        InputMode::FilePath | InputMode::Language => handle_prompt(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_cursor = app.session.draft.chars().count();
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('r') => app.request_rephrase(),

        KeyCode::Char('u') => open_prompt(app, InputMode::FilePath, String::new()),
        KeyCode::Char('l') => app.cycle_language(),
        KeyCode::Char('L') => {
            let current = app.session.language().to_string();
            open_prompt(app, InputMode::Language, current);
        }

        KeyCode::Char('d') => app.start_download(),

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown => app.scroll_down(app.view_height.max(2) / 2),
        KeyCode::PageUp => app.scroll_up(app.view_height.max(2) / 2),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_latest(),

        KeyCode::Esc => app.session.clear_notice(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.send_message(),
        _ => edit_line(&mut app.session.draft, &mut app.input_cursor, key),
    }
}

fn open_prompt(app: &mut App, mode: InputMode, initial: String) {
    app.prompt_cursor = initial.chars().count();
    app.prompt_input = initial;
    app.input_mode = mode;
}

fn handle_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.prompt_input.clear();
            app.prompt_cursor = 0;
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            let value = std::mem::take(&mut app.prompt_input);
            app.prompt_cursor = 0;
            match app.input_mode {
                InputMode::FilePath => app.start_upload(&value),
                InputMode::Language => app.set_language(&value),
                InputMode::Normal | InputMode::Editing => {}
            }
            app.input_mode = InputMode::Normal;
        }
        _ => edit_line(&mut app.prompt_input, &mut app.prompt_cursor, key),
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
