use ratatui::layout::Rect;
use uet_assistant_core::{ChatSession, MAX_QUESTION_CHARS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Chat,
    About,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Offered on the chat screen until the first question goes out.
pub const EXAMPLE_QUESTIONS: [&str; 5] = [
    "What departments are available at UET?",
    "Tell me about Computer Science programs",
    "What are the admission requirements?",
    "Which departments offer PhD programs?",
    "Tell me about the Electrical Engineering faculty",
];

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Conversation
    pub session: ChatSession,
    pub endpoint: String,
    pub cursor: usize, // in chars, within the session draft

    // Chat view
    pub show_examples: bool,
    pub show_agent_details: bool,
    pub chat_scroll: u16,
    pub follow_output: bool,
    pub chat_height: u16,      // inner height, set during render
    pub chat_total_lines: u16, // wrapped transcript height, set during render
    pub chat_area: Option<Rect>,

    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(session: ChatSession, endpoint: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            screen: Screen::Home,
            input_mode: InputMode::Normal,

            session,
            endpoint: endpoint.into(),
            cursor: 0,

            show_examples: true,
            show_agent_details: false,
            chat_scroll: 0,
            follow_output: true,
            chat_height: 0,
            chat_total_lines: 0,
            chat_area: None,

            animation_frame: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.session.is_pending()
    }

    pub fn draft_chars(&self) -> usize {
        self.session.draft().chars().count()
    }

    // Screen switching
    pub fn open_chat(&mut self) {
        self.screen = Screen::Chat;
        self.input_mode = InputMode::Editing;
    }

    pub fn open_about(&mut self) {
        self.screen = Screen::About;
        self.input_mode = InputMode::Normal;
    }

    pub fn go_home(&mut self) {
        self.screen = Screen::Home;
        self.input_mode = InputMode::Normal;
    }

    // Composer editing. The draft lives in the session; the app only tracks the cursor.

    /// Insert at the cursor. Refused once the draft holds `MAX_QUESTION_CHARS`.
    pub fn insert_char(&mut self, c: char) -> bool {
        if self.draft_chars() >= MAX_QUESTION_CHARS {
            return false;
        }
        let mut draft = self.session.draft().to_string();
        let cursor = self.cursor.min(draft.chars().count());
        draft.insert(char_to_byte_index(&draft, cursor), c);
        self.session.update_draft(draft);
        self.cursor = cursor + 1;
        true
    }

    pub fn backspace(&mut self) {
        let cursor = self.cursor.min(self.draft_chars());
        if cursor > 0 {
            let mut draft = self.session.draft().to_string();
            draft.remove(char_to_byte_index(&draft, cursor - 1));
            self.session.update_draft(draft);
            self.cursor = cursor - 1;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.draft_chars() {
            let mut draft = self.session.draft().to_string();
            draft.remove(char_to_byte_index(&draft, self.cursor));
            self.session.update_draft(draft);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.draft_chars());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.draft_chars();
    }

    /// Copy an example question into the composer.
    pub fn use_example(&mut self, index: usize) {
        if let Some(question) = EXAMPLE_QUESTIONS.get(index) {
            self.session.update_draft(*question);
            self.cursor = question.chars().count();
            self.input_mode = InputMode::Editing;
        }
    }

    /// Hand the draft to the session. Empty drafts and sends while a request
    /// is pending are ignored by the session itself.
    pub fn submit(&mut self) {
        if self.session.send().is_some() {
            self.cursor = 0;
            self.show_examples = false;
            self.follow_output = true;
        }
    }

    pub fn reset_chat(&mut self) {
        self.session.reset();
        self.cursor = 0;
        self.chat_scroll = 0;
        self.follow_output = true;
        self.show_examples = true;
    }

    /// Called on every Tick event.
    pub fn tick(&mut self) {
        if self.session.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.session.poll_response() {
            self.follow_output = true;
        }
    }

    // Transcript scrolling
    pub fn max_chat_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_output = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_chat_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_output = self.chat_scroll >= max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use async_trait::async_trait;
    use uet_assistant_core::{AnswerService, AskError, AskResponse};

    struct Echo;

    #[async_trait]
    impl AnswerService for Echo {
        async fn ask(&self, question: &str) -> Result<AskResponse, AskError> {
            Ok(AskResponse::text(format!("echo: {question}")))
        }
    }

    fn app() -> App {
        let session = ChatSession::new(Arc::new(Echo), Duration::from_secs(5));
        App::new(session, "http://localhost:8000/ask")
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.insert_char(c);
        }
    }

    #[tokio::test]
    async fn editing_respects_cursor_and_utf8() {
        let mut app = app();
        type_text(&mut app, "Fee strcture");
        for _ in 0..5 {
            app.cursor_left();
        }
        app.insert_char('u');
        assert_eq!(app.session.draft(), "Fee structure");

        app.cursor_home();
        app.delete();
        type_text(&mut app, "Ü");
        assert_eq!(app.session.draft(), "Üee structure");

        app.cursor_end();
        app.backspace();
        assert_eq!(app.session.draft(), "Üee structur");
        assert_eq!(app.cursor, 12);
    }

    #[tokio::test]
    async fn draft_is_capped_at_limit() {
        let mut app = app();
        type_text(&mut app, &"a".repeat(MAX_QUESTION_CHARS));
        assert!(!app.insert_char('b'));
        assert_eq!(app.draft_chars(), MAX_QUESTION_CHARS);
    }

    #[tokio::test]
    async fn example_fills_composer() {
        let mut app = app();
        app.use_example(2);
        assert_eq!(app.session.draft(), EXAMPLE_QUESTIONS[2]);
        assert_eq!(app.cursor, EXAMPLE_QUESTIONS[2].chars().count());
        assert_eq!(app.input_mode, InputMode::Editing);

        app.use_example(99);
        assert_eq!(app.session.draft(), EXAMPLE_QUESTIONS[2]);
    }

    #[tokio::test]
    async fn submit_hides_examples_and_tick_applies_answer() {
        let mut app = app();
        type_text(&mut app, "What are the admission requirements?");
        app.submit();

        assert!(!app.show_examples);
        assert_eq!(app.cursor, 0);
        assert!(app.is_pending());

        for _ in 0..200 {
            app.tick();
            if !app.is_pending() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let last = app.session.messages().last().unwrap();
        assert_eq!(last.content, "echo: What are the admission requirements?");
    }

    #[tokio::test]
    async fn blank_submit_keeps_examples() {
        let mut app = app();
        type_text(&mut app, "   ");
        app.submit();
        assert!(app.show_examples);
        assert!(!app.is_pending());
        assert_eq!(app.session.messages().len(), 1);
    }

    #[tokio::test]
    async fn scrolling_up_stops_following() {
        let mut app = app();
        app.chat_height = 10;
        app.chat_total_lines = 30;
        app.chat_scroll = 20;

        app.scroll_up(3);
        assert_eq!(app.chat_scroll, 17);
        assert!(!app.follow_output);

        app.scroll_down(10);
        assert_eq!(app.chat_scroll, 20);
        assert!(app.follow_output);
    }

    #[tokio::test]
    async fn reset_restores_fresh_chat() {
        let mut app = app();
        type_text(&mut app, "hello");
        app.submit();
        app.reset_chat();

        assert_eq!(app.session.messages().len(), 1);
        assert!(app.show_examples);
        assert!(!app.is_pending());
    }
}
