//! Render extensions.
//!
//! A [`RenderExtension`] is invoked at three points of the render pipeline:
//!
//! 1. [`before_markdown_rendered`](RenderExtension::before_markdown_rendered) with the raw markdown
//! 2. [`after_markdown_rendered`](RenderExtension::after_markdown_rendered) with the generated HTML
//! 3. [`after_document_rendered`](RenderExtension::after_document_rendered) with the final page HTML
//!
//! Hooks communicate by mutating the shared argument. Each extension sees the
//! output of the previous one, in registration order.
//!
//! [`RenderExtensionManager`] owns the ordered list. At most one extension per
//! name (case-insensitive) is registered; re-adding moves it to the end.

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

/// Context of the document being rendered.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderContext<'a> {
    /// Request path of the document, when rendered for a page.
    pub relative_path: Option<&'a str>,
    /// Base path for relative links in the document.
    pub base_path: Option<&'a str>,
    /// Front matter block without delimiters.
    pub yaml_header: Option<&'a str>,
}

/// Argument of the before-markdown hook.
#[derive(Debug)]
pub struct MarkdownArgs<'a> {
    pub markdown: String,
    pub context: RenderContext<'a>,
}

/// Argument of the after-markdown hook.
#[derive(Debug)]
pub struct HtmlArgs<'a> {
    pub html: String,
    /// Markdown the HTML was rendered from, after before-hooks ran.
    pub markdown: &'a str,
    pub context: RenderContext<'a>,
}

/// Argument of the after-document hook.
#[derive(Debug)]
pub struct DocumentArgs {
    pub html: String,
}

/// Error raised by a render extension hook.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ExtensionError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ExtensionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Pipeline point at which a hook runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookStage {
    BeforeMarkdownRendered,
    AfterMarkdownRendered,
    AfterDocumentRendered,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeforeMarkdownRendered => "before markdown rendering",
            Self::AfterMarkdownRendered => "after markdown rendering",
            Self::AfterDocumentRendered => "after document rendering",
        })
    }
}

/// A failed hook, with the extension and stage it failed in.
///
/// A failing hook aborts the whole render.
#[derive(Debug, thiserror::Error)]
#[error("render extension '{extension}' failed {stage}")]
pub struct HookError {
    pub extension: String,
    pub stage: HookStage,
    #[source]
    pub source: ExtensionError,
}

/// A pluggable hook object invoked around markdown rendering.
///
/// All hooks default to no-ops. Hooks must tolerate empty input.
pub trait RenderExtension: Send + Sync {
    /// Identity of the extension in the manager.
    fn name(&self) -> &str;

    fn before_markdown_rendered(&self, _args: &mut MarkdownArgs<'_>) -> Result<(), ExtensionError> {
        Ok(())
    }

    fn after_markdown_rendered(&self, _args: &mut HtmlArgs<'_>) -> Result<(), ExtensionError> {
        Ok(())
    }

    fn after_document_rendered(&self, _args: &mut DocumentArgs) -> Result<(), ExtensionError> {
        Ok(())
    }
}

type ExtensionList = Arc<[Arc<dyn RenderExtension>]>;

/// Ordered, de-duplicated registry of render extensions.
///
/// Mutations build a new list and swap it in. Hook traversal works on a
/// snapshot, so rendering never holds the lock while extensions run.
pub struct RenderExtensionManager {
    extensions: RwLock<ExtensionList>,
}

impl RenderExtensionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            extensions: RwLock::new(Vec::new().into()),
        }
    }

    /// Register an extension.
    ///
    /// An extension that is already registered (same instance or same name,
    /// ignoring case) is removed first, so the added one always runs last.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn add(&self, extension: Arc<dyn RenderExtension>) {
        self.add_many([extension]);
    }

    /// Register several extensions in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn add_many(&self, extensions: impl IntoIterator<Item = Arc<dyn RenderExtension>>) {
        let mut guard = self.extensions.write().unwrap();
        let mut list: Vec<_> = guard.iter().cloned().collect();
        for extension in extensions {
            list.retain(|existing| !same_extension(existing, &extension));
            debug!(extension = extension.name(), "Registered render extension");
            list.push(extension);
        }
        *guard = list.into();
    }

    /// Remove the extension with the given name (case-insensitive).
    ///
    /// Returns `true` if an extension was removed.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove(&self, name: &str) -> bool {
        self.remove_where(|existing| existing.name().eq_ignore_ascii_case(name))
    }

    /// Remove a registered extension by instance or name.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_extension(&self, extension: &Arc<dyn RenderExtension>) -> bool {
        self.remove_where(|existing| same_extension(existing, extension))
    }

    fn remove_where(&self, predicate: impl Fn(&Arc<dyn RenderExtension>) -> bool) -> bool {
        let mut guard = self.extensions.write().unwrap();
        if !guard.iter().any(&predicate) {
            return false;
        }
        let list: Vec<_> = guard.iter().filter(|e| !predicate(*e)).cloned().collect();
        *guard = list.into();
        true
    }

    /// Snapshot of the registered extensions in invocation order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn extensions(&self) -> ExtensionList {
        Arc::clone(&self.extensions.read().unwrap())
    }

    /// Look up an extension by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<Arc<dyn RenderExtension>> {
        self.extensions()
            .iter()
            .find(|e| e.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Look up a registered extension by instance.
    pub fn find(&self, extension: &Arc<dyn RenderExtension>) -> Option<Arc<dyn RenderExtension>> {
        self.extensions()
            .iter()
            .find(|e| same_extension(e, extension))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.extensions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions().is_empty()
    }

    /// Remove all extensions.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        *self.extensions.write().unwrap() = Vec::new().into();
    }

    /// Run all before-markdown hooks in order.
    pub fn before_markdown_rendered(&self, args: &mut MarkdownArgs<'_>) -> Result<(), HookError> {
        for extension in self.extensions().iter() {
            extension.before_markdown_rendered(args).map_err(|source| {
                hook_error(extension.as_ref(), HookStage::BeforeMarkdownRendered, source)
            })?;
        }
        Ok(())
    }

    /// Run all after-markdown hooks in order.
    pub fn after_markdown_rendered(&self, args: &mut HtmlArgs<'_>) -> Result<(), HookError> {
        for extension in self.extensions().iter() {
            extension.after_markdown_rendered(args).map_err(|source| {
                hook_error(extension.as_ref(), HookStage::AfterMarkdownRendered, source)
            })?;
        }
        Ok(())
    }

    /// Run all after-document hooks in order.
    pub fn after_document_rendered(&self, args: &mut DocumentArgs) -> Result<(), HookError> {
        for extension in self.extensions().iter() {
            extension.after_document_rendered(args).map_err(|source| {
                hook_error(extension.as_ref(), HookStage::AfterDocumentRendered, source)
            })?;
        }
        Ok(())
    }
}

impl Default for RenderExtensionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RenderExtensionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extensions = self.extensions();
        f.debug_list()
            .entries(extensions.iter().map(|e| e.name()))
            .finish()
    }
}

fn same_extension(a: &Arc<dyn RenderExtension>, b: &Arc<dyn RenderExtension>) -> bool {
    Arc::ptr_eq(a, b) || a.name().eq_ignore_ascii_case(b.name())
}

fn hook_error(extension: &dyn RenderExtension, stage: HookStage, source: ExtensionError) -> HookError {
    HookError {
        extension: extension.name().to_owned(),
        stage,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    static_assertions::assert_impl_all!(RenderExtensionManager: Send, Sync);

    struct Append {
        name: &'static str,
        suffix: &'static str,
    }

    impl RenderExtension for Append {
        fn name(&self) -> &str {
            self.name
        }

        fn before_markdown_rendered(&self, args: &mut MarkdownArgs<'_>) -> Result<(), ExtensionError> {
            args.markdown.push_str(self.suffix);
            Ok(())
        }

        fn after_markdown_rendered(&self, args: &mut HtmlArgs<'_>) -> Result<(), ExtensionError> {
            args.html.push_str(self.suffix);
            Ok(())
        }

        fn after_document_rendered(&self, args: &mut DocumentArgs) -> Result<(), ExtensionError> {
            args.html.push_str(self.suffix);
            Ok(())
        }
    }

    struct Failing;

    impl RenderExtension for Failing {
        fn name(&self) -> &str {
            "Failing"
        }

        fn after_markdown_rendered(&self, _args: &mut HtmlArgs<'_>) -> Result<(), ExtensionError> {
            Err(ExtensionError::new("boom"))
        }
    }

    fn append(name: &'static str, suffix: &'static str) -> Arc<dyn RenderExtension> {
        Arc::new(Append { name, suffix })
    }

    fn names(manager: &RenderExtensionManager) -> Vec<String> {
        manager.extensions().iter().map(|e| e.name().to_owned()).collect()
    }

    #[test]
    fn test_add_preserves_order() {
        let manager = RenderExtensionManager::new();
        manager.add(append("a", "1"));
        manager.add(append("b", "2"));
        assert_eq!(names(&manager), vec!["a", "b"]);
    }

    #[test]
    fn test_readding_same_name_moves_to_end() {
        let manager = RenderExtensionManager::new();
        manager.add(append("Footer", "1"));
        manager.add(append("Other", "2"));
        manager.add(append("footer", "3"));

        assert_eq!(manager.len(), 2);
        assert_eq!(names(&manager), vec!["Other", "footer"]);
    }

    #[test]
    fn test_readding_same_instance_moves_to_end() {
        let manager = RenderExtensionManager::new();
        let ext = append("a", "1");
        manager.add(Arc::clone(&ext));
        manager.add(append("b", "2"));
        manager.add(Arc::clone(&ext));
        assert_eq!(names(&manager), vec!["b", "a"]);
    }

    #[test]
    fn test_add_many_deduplicates() {
        let manager = RenderExtensionManager::new();
        manager.add_many([append("a", "1"), append("b", "2"), append("A", "3")]);
        assert_eq!(names(&manager), vec!["b", "A"]);
    }

    #[test]
    fn test_lookup_and_remove() {
        let manager = RenderExtensionManager::new();
        let ext = append("MySample", "x");
        manager.add(Arc::clone(&ext));
        manager.add(append("Other", "y"));

        assert!(manager.get("mysample").is_some());
        assert!(manager.find(&ext).is_some());
        assert!(manager.get("missing").is_none());

        assert!(manager.remove_extension(&ext));
        assert!(!manager.remove_extension(&ext));
        assert_eq!(names(&manager), vec!["Other"]);

        assert!(manager.remove("OTHER"));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_mutation() {
        let manager = RenderExtensionManager::new();
        manager.add(append("a", "1"));
        let snapshot = manager.extensions();
        manager.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let manager = RenderExtensionManager::new();
        manager.add_many([append("a", "1"), append("b", "2")]);

        let mut md = MarkdownArgs {
            markdown: "md".to_owned(),
            context: RenderContext::default(),
        };
        manager.before_markdown_rendered(&mut md).unwrap();
        assert_eq!(md.markdown, "md12");

        let mut html = HtmlArgs {
            html: String::new(),
            markdown: &md.markdown,
            context: RenderContext::default(),
        };
        manager.after_markdown_rendered(&mut html).unwrap();
        assert_eq!(html.html, "12");

        let mut doc = DocumentArgs {
            html: "page".to_owned(),
        };
        manager.after_document_rendered(&mut doc).unwrap();
        assert_eq!(doc.html, "page12");
    }

    #[test]
    fn test_hook_failure_aborts_and_names_extension() {
        let manager = RenderExtensionManager::new();
        let failing: Arc<dyn RenderExtension> = Arc::new(Failing);
        manager.add_many([append("a", "1"), failing, append("b", "2")]);

        let mut html = HtmlArgs {
            html: String::new(),
            markdown: "",
            context: RenderContext::default(),
        };
        let err = manager.after_markdown_rendered(&mut html).unwrap_err();

        assert_eq!(err.extension, "Failing");
        assert_eq!(err.stage, HookStage::AfterMarkdownRendered);
        assert_eq!(
            err.to_string(),
            "render extension 'Failing' failed after markdown rendering"
        );
        // Later extensions never ran
        assert_eq!(html.html, "1");
    }

    #[test]
    fn test_default_hooks_are_noops() {
        let manager = RenderExtensionManager::new();
        manager.add(Arc::new(Failing));
        let mut md = MarkdownArgs {
            markdown: String::new(),
            context: RenderContext::default(),
        };
        manager.before_markdown_rendered(&mut md).unwrap();
        assert_eq!(md.markdown, "");
    }
}
