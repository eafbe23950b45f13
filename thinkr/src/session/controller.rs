//! Session controller: the active selection plus every user action.

use std::sync::Arc;

use super::context::ContextWindow;
use crate::collab::Collaborators;
use crate::error::{ExtractionError, SessionError};
use crate::models::{Conversation, Conversations, Message, PDF_LABEL, WEB_LABEL};
use crate::store::ConversationStore;

/// Maximum characters of extracted PDF text appended to a conversation.
pub const PDF_CHAR_LIMIT: usize = 8000;

/// Maximum web search snippets appended per query.
pub const SEARCH_RESULT_LIMIT: usize = 5;

/// Instruction used to have the model name a conversation.
pub const TITLE_INSTRUCTION: &str = "Give a short chat title";

const TITLE_MAX_CHARS: usize = 80;
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

type Result<T> = std::result::Result<T, SessionError>;

/// One interactive session over a conversation store.
///
/// Every operation reloads the store, mutates, and writes the full mapping
/// back, so the file on disk stays the source of truth.
pub struct Session {
    store: Arc<dyn ConversationStore>,
    collab: Collaborators,
    window: ContextWindow,
    active: Option<String>,
}

impl Session {
    /// Open a session, keeping `active` only if it still exists in the store.
    pub fn open(
        store: Arc<dyn ConversationStore>,
        collab: Collaborators,
        window: ContextWindow,
        active: Option<String>,
    ) -> Result<Self> {
        let active = match active {
            Some(id) if store.load()?.contains_key(&id) => Some(id),
            Some(id) => {
                tracing::info!(conversation_id = %id, "dropping stale active selection");
                None
            }
            None => None,
        };

        Ok(Self {
            store,
            collab,
            window,
            active,
        })
    }

    /// Id of the active conversation, if any.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// All conversations, freshly loaded.
    pub fn conversations(&self) -> Result<Conversations> {
        Ok(self.store.load()?)
    }

    pub fn conversation(&self, id: &str) -> Result<Conversation> {
        self.store
            .load()?
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Return the active id, creating a conversation first if none is selected.
    pub fn ensure_active(&mut self) -> Result<String> {
        if let Some(id) = &self.active {
            return Ok(id.clone());
        }
        self.new_conversation()
    }

    /// Create a seeded conversation, persist it, and make it active.
    pub fn new_conversation(&mut self) -> Result<String> {
        let mut conversations = self.store.load()?;
        let id = crate::models::generate_id();
        conversations.insert(id.clone(), Conversation::new());
        self.store.save(&conversations)?;

        tracing::info!(conversation_id = %id, "created conversation");
        self.active = Some(id.clone());
        Ok(id)
    }

    pub fn select(&mut self, id: &str) -> Result<()> {
        if !self.store.load()?.contains_key(id) {
            return Err(SessionError::NotFound(id.to_string()));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    /// Set the title. A blank title is ignored; returns whether anything changed.
    pub fn rename(&self, id: &str, title: &str) -> Result<bool> {
        let title = title.trim();
        let mut conversations = self.store.load()?;
        let conv = conversations
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        if title.is_empty() || conv.title == title {
            return Ok(false);
        }

        conv.title = title.to_string();
        self.store.save(&conversations)?;
        Ok(true)
    }

    /// Delete a conversation. If it was active, the oldest remaining one
    /// becomes active, or nothing is when the store is empty.
    pub fn delete(&mut self, id: &str) -> Result<Option<String>> {
        let mut conversations = self.store.load()?;
        if conversations.remove(id).is_none() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        self.store.save(&conversations)?;
        tracing::info!(conversation_id = %id, "deleted conversation");

        if self.active.as_deref() == Some(id) {
            self.active = conversations.keys().next().cloned();
        }
        Ok(self.active.clone())
    }

    /// Append extracted PDF text as a system message. Returns the number of
    /// text characters appended.
    ///
    /// Extraction is CPU-bound and runs on the blocking pool.
    pub async fn attach_pdf(&self, bytes: Vec<u8>) -> Result<usize> {
        let id = self.require_active()?;
        let extractor = Arc::clone(&self.collab.extractor);
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(|e| ExtractionError::Pdf(format!("extraction task failed: {e}")))??;
        let truncated: String = text.chars().take(PDF_CHAR_LIMIT).collect();
        let chars = truncated.chars().count();

        self.append(id, Message::system(format!("{PDF_LABEL}{truncated}")))?;
        tracing::info!(conversation_id = %id, chars, "attached PDF");
        Ok(chars)
    }

    /// Accept an image upload. Images are validated but not forwarded to the
    /// model, so the conversation is unchanged.
    pub fn attach_image(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let id = self.require_active()?;
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if !IMAGE_EXTENSIONS.contains(&ext.as_str()) || !looks_like_image(bytes) {
            return Err(SessionError::UnsupportedAttachment(name.to_string()));
        }

        tracing::info!(conversation_id = %id, name, bytes = bytes.len(), "image accepted");
        Ok(())
    }

    /// Append web search snippets as a system message. Returns the number of
    /// snippets appended; a blank query does nothing.
    pub async fn attach_search(&self, query: &str) -> Result<usize> {
        let id = self.require_active()?;
        let query = query.trim();
        if query.is_empty() {
            return Ok(0);
        }

        let snippets = self
            .collab
            .search
            .search(query, SEARCH_RESULT_LIMIT)
            .await?;
        let count = snippets.len().min(SEARCH_RESULT_LIMIT);
        let body: String = snippets
            .iter()
            .take(SEARCH_RESULT_LIMIT)
            .map(|s| format!("{s}\n"))
            .collect();

        self.append(id, Message::system(format!("{WEB_LABEL}{body}")))?;
        tracing::info!(conversation_id = %id, results = count, "attached web results");
        Ok(count)
    }

    /// Send a prompt and return the model's reply.
    ///
    /// A conversation still carrying the default title gets one from a second
    /// completion call. The store is written once, after both calls succeed.
    pub async fn submit(&self, prompt: &str) -> Result<String> {
        let id = self.require_active()?;
        if prompt.trim().is_empty() {
            return Err(SessionError::EmptyPrompt);
        }

        let mut conversations = self.store.load()?;
        let conv = conversations
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        conv.push(Message::user(prompt));
        let request = self.window.select(&conv.messages);
        let reply = self.collab.completion.complete(&request).await?;
        conv.push(Message::assistant(reply.clone()));

        if conv.has_default_title() {
            let title_request = [Message::system(TITLE_INSTRUCTION), Message::user(prompt)];
            let raw = self.collab.completion.complete(&title_request).await?;
            if let Some(title) = clean_title(&raw) {
                tracing::debug!(conversation_id = %id, title = %title, "titled conversation");
                conv.title = title;
            }
        }

        self.store.save(&conversations)?;
        Ok(reply)
    }

    fn require_active(&self) -> Result<&str> {
        self.active
            .as_deref()
            .ok_or(SessionError::NoActiveConversation)
    }

    fn append(&self, id: &str, message: Message) -> Result<()> {
        let mut conversations = self.store.load()?;
        conversations
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?
            .push(message);
        self.store.save(&conversations)?;
        Ok(())
    }
}

/// First non-empty line of a model-suggested title, without wrapping quotes
/// or markdown emphasis.
fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let decoration = |c: char| matches!(c, '"' | '\'' | '*' | '#' | '`');
    let line = line.trim_matches(decoration).trim();
    let line = line
        .strip_prefix("Title:")
        .unwrap_or(line)
        .trim()
        .trim_matches(decoration)
        .trim();

    if line.is_empty() {
        return None;
    }
    Some(line.chars().take(TITLE_MAX_CHARS).collect())
}

fn looks_like_image(bytes: &[u8]) -> bool {
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G'];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
    bytes.starts_with(PNG) || bytes.starts_with(JPEG)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::collab::fake::{collaborators, EchoCompletion, FixedExtractor};
    use crate::models::{Role, DEFAULT_TITLE};
    use crate::store::{JsonFileStore, MemoryStore};

    fn session_with(store: Arc<dyn ConversationStore>, completion: Arc<EchoCompletion>) -> Session {
        Session::open(
            store,
            collaborators(completion),
            ContextWindow::default(),
            None,
        )
        .unwrap()
    }

    fn memory_session() -> (Session, Arc<MemoryStore>, Arc<EchoCompletion>) {
        let store = Arc::new(MemoryStore::new());
        let completion = Arc::new(EchoCompletion::default());
        let session = session_with(store.clone(), completion.clone());
        (session, store, completion)
    }

    #[test]
    fn new_conversation_is_seeded_and_active() {
        let (mut session, store, _) = memory_session();
        let id = session.new_conversation().unwrap();

        assert_eq!(session.active(), Some(id.as_str()));
        let conversations = store.load().unwrap();
        let conv = &conversations[&id];
        assert_eq!(conv.title, DEFAULT_TITLE);
        assert_eq!(conv.messages[0].role, Role::System);
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn ensure_active_creates_only_once() {
        let (mut session, store, _) = memory_session();
        let first = session.ensure_active().unwrap();
        let second = session.ensure_active().unwrap();
        assert_eq!(first, second);
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn select_unknown_id_keeps_selection() {
        let (mut session, _, _) = memory_session();
        let id = session.new_conversation().unwrap();

        let err = session.select("missing").unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
        assert_eq!(session.active(), Some(id.as_str()));
    }

    #[test]
    fn select_switches_active() {
        let (mut session, _, _) = memory_session();
        let first = session.new_conversation().unwrap();
        session.new_conversation().unwrap();

        session.select(&first).unwrap();
        assert_eq!(session.active(), Some(first.as_str()));
    }

    #[test]
    fn rename_sets_title() {
        let (mut session, store, _) = memory_session();
        let id = session.new_conversation().unwrap();

        assert!(session.rename(&id, "  Groceries ").unwrap());
        assert_eq!(store.load().unwrap()[&id].title, "Groceries");
    }

    #[test]
    fn rename_with_empty_title_is_noop() {
        let (mut session, store, _) = memory_session();
        let id = session.new_conversation().unwrap();
        let saves = store.saves();

        assert!(!session.rename(&id, "").unwrap());
        assert!(!session.rename(&id, "   ").unwrap());
        assert_eq!(store.load().unwrap()[&id].title, DEFAULT_TITLE);
        assert_eq!(store.saves(), saves);
    }

    #[test]
    fn rename_unknown_id_fails() {
        let (session, _, _) = memory_session();
        assert!(matches!(
            session.rename("missing", "x"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn delete_active_falls_back_to_oldest() {
        let (mut session, _, _) = memory_session();
        let oldest = session.new_conversation().unwrap();
        let middle = session.new_conversation().unwrap();
        let newest = session.new_conversation().unwrap();

        let active = session.delete(&newest).unwrap();
        assert_eq!(active.as_deref(), Some(oldest.as_str()));

        session.select(&middle).unwrap();
        let active = session.delete(&oldest).unwrap();
        assert_eq!(active.as_deref(), Some(middle.as_str()));
    }

    #[tokio::test]
    async fn delete_last_conversation_clears_selection() {
        let (mut session, store, _) = memory_session();
        let id = session.new_conversation().unwrap();

        assert_eq!(session.delete(&id).unwrap(), None);
        assert_eq!(session.active(), None);
        assert!(store.load().unwrap().is_empty());
        assert!(matches!(
            session.submit("anyone there?").await,
            Err(SessionError::NoActiveConversation)
        ));

        let fresh = session.ensure_active().unwrap();
        assert_ne!(fresh, id);
        assert!(store.load().unwrap().contains_key(&fresh));
    }

    #[test]
    fn delete_unknown_id_fails() {
        let (mut session, _, _) = memory_session();
        assert!(matches!(
            session.delete("missing"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn open_drops_stale_selection() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::open(
            store,
            collaborators(Arc::new(EchoCompletion::default())),
            ContextWindow::default(),
            Some("gone".to_string()),
        )
        .unwrap();
        assert_eq!(session.active(), None);
    }

    #[tokio::test]
    async fn attach_pdf_caps_text() {
        let (mut session, store, _) = memory_session();
        let id = session.new_conversation().unwrap();

        let chars = session.attach_pdf(b"%PDF-1.7".to_vec()).await.unwrap();
        assert_eq!(chars, PDF_CHAR_LIMIT);

        let conversations = store.load().unwrap();
        let conv = &conversations[&id];
        let last = conv.messages.last().unwrap();
        assert_eq!(last.role, Role::System);
        let body = last.content.strip_prefix(PDF_LABEL).unwrap();
        assert_eq!(body.chars().count(), PDF_CHAR_LIMIT);
    }

    #[tokio::test]
    async fn attach_pdf_keeps_short_text_whole() {
        let store = Arc::new(MemoryStore::new());
        let mut collab = collaborators(Arc::new(EchoCompletion::default()));
        collab.extractor = Arc::new(FixedExtractor("short résumé".to_string()));
        let mut session =
            Session::open(store.clone(), collab, ContextWindow::default(), None).unwrap();
        let id = session.new_conversation().unwrap();

        assert_eq!(session.attach_pdf(Vec::new()).await.unwrap(), 12);
        assert_eq!(
            store.load().unwrap()[&id].messages[1].content,
            "PDF:\nshort résumé"
        );
    }

    #[tokio::test]
    async fn attach_without_active_conversation_fails() {
        let (session, _, _) = memory_session();
        assert!(matches!(
            session.attach_pdf(Vec::new()).await,
            Err(SessionError::NoActiveConversation)
        ));
    }

    #[tokio::test]
    async fn attach_search_appends_at_most_five_snippets() {
        let (mut session, store, _) = memory_session();
        let id = session.new_conversation().unwrap();

        assert_eq!(session.attach_search("rust async").await.unwrap(), 5);

        let conversations = store.load().unwrap();
        let conv = &conversations[&id];
        let content = &conv.messages.last().unwrap().content;
        let body = content.strip_prefix(WEB_LABEL).unwrap();
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines, vec!["snippet 1", "snippet 2", "snippet 3", "snippet 4", "snippet 5"]);
        assert!(body.ends_with('\n'));
    }

    #[tokio::test]
    async fn blank_search_query_is_noop() {
        let (mut session, store, _) = memory_session();
        let id = session.new_conversation().unwrap();

        assert_eq!(session.attach_search("  ").await.unwrap(), 0);
        assert_eq!(store.load().unwrap()[&id].messages.len(), 1);
    }

    #[test]
    fn attach_image_validates_type() {
        let (mut session, store, _) = memory_session();
        let id = session.new_conversation().unwrap();

        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A];
        session.attach_image("cat.PNG", &png).unwrap();
        assert_eq!(store.load().unwrap()[&id].messages.len(), 1);

        assert!(matches!(
            session.attach_image("cat.gif", &png),
            Err(SessionError::UnsupportedAttachment(_))
        ));
        assert!(matches!(
            session.attach_image("cat.jpg", b"plain text"),
            Err(SessionError::UnsupportedAttachment(_))
        ));
    }

    #[tokio::test]
    async fn submit_appends_reply_and_titles_conversation() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("chats.json")));
        let completion = Arc::new(EchoCompletion::default());
        let mut session = session_with(store.clone(), completion.clone());

        session.new_conversation().unwrap();
        let reply = session.submit("hello").await.unwrap();
        assert_eq!(reply, "echo: hello");

        let conversations = store.load().unwrap();
        assert_eq!(conversations.len(), 1);
        let conv = conversations.values().next().unwrap();
        let roles: Vec<_> = conv.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(conv.messages[1].content, "hello");
        assert_ne!(conv.title, DEFAULT_TITLE);
        assert_eq!(conv.title, "hello");
        assert_eq!(completion.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn submit_sends_full_history_and_titles_once() {
        let (mut session, store, completion) = memory_session();
        let id = session.new_conversation().unwrap();

        session.submit("first").await.unwrap();
        session.submit("second").await.unwrap();

        assert_eq!(completion.calls.load(Ordering::SeqCst), 3);
        let requests = completion.requests.lock().unwrap();
        let last = requests.last().unwrap();
        assert_eq!(last.len(), 4);
        assert_eq!(last[0].content, crate::models::SEED_PROMPT);
        assert_eq!(last[3].content, "second");

        let title_request = &requests[1];
        assert_eq!(title_request[0].content, TITLE_INSTRUCTION);
        assert_eq!(title_request[1].content, "first");

        assert_eq!(store.load().unwrap()[&id].title, "first");
    }

    #[tokio::test]
    async fn submit_sends_history_through_context_window() {
        let store = Arc::new(MemoryStore::new());
        let completion = Arc::new(EchoCompletion::default());
        let window = ContextWindow {
            max_chars: 10_000,
            max_messages: 2,
        };
        let mut session =
            Session::open(store.clone(), collaborators(completion.clone()), window, None).unwrap();
        let id = session.new_conversation().unwrap();

        session.submit("one").await.unwrap();
        session.submit("two").await.unwrap();
        session.submit("three").await.unwrap();

        let requests = completion.requests.lock().unwrap();
        let last = requests.last().unwrap();
        let contents: Vec<_> = last.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec![crate::models::SEED_PROMPT, "echo: two", "three"]);

        // stored history is untouched
        assert_eq!(store.load().unwrap()[&id].messages.len(), 7);
    }

    #[tokio::test]
    async fn delete_falls_back_to_first_key_for_foreign_ids() {
        let store = Arc::new(MemoryStore::new());
        let mut convs = Conversations::new();
        for id in ["f3a1c2d4-legacy", "0b9e7a55-legacy", "7c4d2e10-legacy"] {
            convs.insert(id.to_string(), Conversation::new());
        }
        store.save(&convs).unwrap();

        let mut session = Session::open(
            store,
            collaborators(Arc::new(EchoCompletion::default())),
            ContextWindow::default(),
            Some("7c4d2e10-legacy".to_string()),
        )
        .unwrap();

        let active = session.delete("7c4d2e10-legacy").unwrap();
        assert_eq!(active.as_deref(), Some("0b9e7a55-legacy"));
    }

    #[tokio::test]
    async fn submit_keeps_custom_title() {
        let (mut session, store, completion) = memory_session();
        let id = session.new_conversation().unwrap();
        session.rename(&id, "Mine").unwrap();

        session.submit("hello").await.unwrap();
        assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.load().unwrap()[&id].title, "Mine");
    }

    #[tokio::test]
    async fn submit_rejects_blank_prompt() {
        let (mut session, _, completion) = memory_session();
        session.new_conversation().unwrap();

        assert!(matches!(
            session.submit("   ").await,
            Err(SessionError::EmptyPrompt)
        ));
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_completion_leaves_store_untouched() {
        let store = Arc::new(MemoryStore::new());
        let completion = Arc::new(EchoCompletion {
            fail: true,
            ..EchoCompletion::default()
        });
        let mut session = session_with(store.clone(), completion);
        let id = session.new_conversation().unwrap();

        let err = session.submit("hello").await.unwrap_err();
        assert!(matches!(err, SessionError::Completion(_)));
        assert_eq!(store.load().unwrap()[&id].messages.len(), 1);
    }

    #[test]
    fn clean_title_strips_decoration() {
        assert_eq!(clean_title("\"Trip Planning\"").as_deref(), Some("Trip Planning"));
        assert_eq!(clean_title("\n**Rust Help**\nmore").as_deref(), Some("Rust Help"));
        assert_eq!(clean_title("Title: Budget").as_deref(), Some("Budget"));
        assert_eq!(clean_title("  \n \"\" "), None);
        assert_eq!(clean_title(&"a".repeat(200)).map(|t| t.len()), Some(TITLE_MAX_CHARS));
    }
}
