//! Frame tree and frame switching.
//!
//! The page's frames form a tree rooted at the main frame. The tree is
//! rebuilt lazily from the subprocess's live listing (page scripts create
//! and destroy frames at will), and navigation invalidates it. The
//! "current frame" is a single pointer into the tree, changed only by the
//! explicit switch operations below; every queued command targets the
//! current frame.
//!
//! Parent links are relations resolved through the flat node table, never
//! back-references, so the tree cannot form a cyclic graph.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::FrameId;
use crate::protocol::{Command, FrameCommand};

use super::Page;

// ============================================================================
// FrameInfo
// ============================================================================

/// One frame in the page's frame listing.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// Frame ID.
    pub id: FrameId,
    /// Parent frame ID (`None` for the main frame).
    pub parent: Option<FrameId>,
    /// Frame name, if the document named it.
    pub name: Option<String>,
    /// Frame URL.
    pub url: String,
    /// `true` if this frame currently holds focus.
    pub focused: bool,
}

// ============================================================================
// FrameTree
// ============================================================================

/// Flat parent-linked table of the page's frames.
#[derive(Debug, Clone, Default)]
pub(crate) struct FrameTree {
    frames: Vec<FrameInfo>,
}

impl FrameTree {
    /// Parses a tree from a `frame.list` result.
    ///
    /// Malformed entries are skipped.
    pub(crate) fn from_result(value: &Value) -> Self {
        let frames = value
            .get("frames")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(parse_frame_info).collect())
            .unwrap_or_default();

        Self { frames }
    }

    /// Looks up a frame by ID.
    pub(crate) fn get(&self, id: FrameId) -> Option<&FrameInfo> {
        self.frames.iter().find(|f| f.id == id)
    }

    /// Direct children of a frame, in listing order.
    pub(crate) fn children_of(&self, id: FrameId) -> impl Iterator<Item = &FrameInfo> {
        self.frames.iter().filter(move |f| f.parent == Some(id))
    }

    /// Resolves a child of `parent` by name.
    pub(crate) fn child_by_name(&self, parent: FrameId, name: &str) -> Option<FrameId> {
        self.children_of(parent)
            .find(|f| f.name.as_deref() == Some(name))
            .map(|f| f.id)
    }

    /// Resolves a child of `parent` by position.
    pub(crate) fn child_by_index(&self, parent: FrameId, index: usize) -> Option<FrameId> {
        self.children_of(parent).nth(index).map(|f| f.id)
    }

    /// Resolves a frame's parent.
    pub(crate) fn parent_of(&self, id: FrameId) -> Option<FrameId> {
        self.get(id).and_then(|f| f.parent)
    }

    /// The frame currently holding focus, if the listing marks one.
    pub(crate) fn focused(&self) -> Option<FrameId> {
        self.frames.iter().find(|f| f.focused).map(|f| f.id)
    }
}

/// Parses one frame entry from the listing.
fn parse_frame_info(value: &Value) -> Option<FrameInfo> {
    Some(FrameInfo {
        id: FrameId::new(value.get("frameId")?.as_u64()?),
        parent: value
            .get("parentId")
            .and_then(Value::as_u64)
            .map(FrameId::new),
        name: value
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        url: value.get("url")?.as_str()?.to_string(),
        focused: value
            .get("focused")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

// ============================================================================
// FrameTarget
// ============================================================================

/// Addresses a child frame by name or position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameTarget {
    /// Frame name.
    Name(String),
    /// Zero-based position among the current frame's children.
    Index(usize),
}

impl From<&str> for FrameTarget {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for FrameTarget {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for FrameTarget {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for FrameTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name={name}"),
            Self::Index(index) => write!(f, "index={index}"),
        }
    }
}

// ============================================================================
// Page - Frame Switching
// ============================================================================

impl Page {
    /// Switches to a child frame of the current frame, by name or
    /// position.
    ///
    /// The frame listing is refreshed from the subprocess first, since
    /// page scripts may have created or destroyed frames.
    ///
    /// # Errors
    ///
    /// [`Error::FrameNotFound`] if no child matches; the current frame
    /// pointer is left unchanged.
    pub async fn switch_to_frame(&self, target: impl Into<FrameTarget>) -> Result<()> {
        let target = target.into();
        let tree = self.refresh_frame_tree().await?;

        let current = self.current_frame();
        let resolved = match &target {
            FrameTarget::Name(name) => tree.child_by_name(current, name),
            FrameTarget::Index(index) => tree.child_by_index(current, *index),
        };

        match resolved {
            Some(id) => {
                debug!(session_id = %self.shared.id, %target, frame = %id, "Switched frame");
                self.shared.state.lock().current_frame = id;
                Ok(())
            }
            None => Err(Error::frame_not_found(target.to_string())),
        }
    }

    /// Switches to the parent of the current frame.
    ///
    /// Returns `false` (and does nothing) when the current frame is
    /// already the main frame, `true` otherwise.
    pub async fn switch_to_parent_frame(&self) -> Result<bool> {
        let current = self.current_frame();
        if current.is_main() {
            return Ok(false);
        }

        // Prefer the cached tree; only refresh if the frame is unknown
        // (the pointer can never survive a navigation, so a cached tree
        // covering the current frame is authoritative for parenthood).
        let cached_parent = {
            let state = self.shared.state.lock();
            state.frame_tree.as_ref().and_then(|t| t.parent_of(current))
        };

        let parent = match cached_parent {
            Some(parent) => parent,
            None => self
                .refresh_frame_tree()
                .await?
                .parent_of(current)
                .ok_or_else(|| Error::frame_not_found(format!("parent of {current}")))?,
        };

        debug!(session_id = %self.shared.id, frame = %parent, "Switched to parent frame");
        self.shared.state.lock().current_frame = parent;
        Ok(true)
    }

    /// Switches to the main (top-level) frame.
    pub fn switch_to_main_frame(&self) {
        debug!(session_id = %self.shared.id, "Switched to main frame");
        self.shared.state.lock().current_frame = FrameId::MAIN;
    }

    /// Switches to the frame that currently holds focus.
    ///
    /// Falls back to the main frame when the listing marks no focused
    /// frame.
    pub async fn switch_to_focused_frame(&self) -> Result<()> {
        let tree = self.refresh_frame_tree().await?;
        let focused = tree.focused().unwrap_or(FrameId::MAIN);

        debug!(session_id = %self.shared.id, frame = %focused, "Switched to focused frame");
        self.shared.state.lock().current_frame = focused;
        Ok(())
    }

    /// Gets the name of the current frame (empty for the main frame or an
    /// anonymous frame).
    pub async fn frame_name(&self) -> Result<String> {
        let tree = self.refresh_frame_tree().await?;
        let current = self.current_frame();

        Ok(tree
            .get(current)
            .and_then(|f| f.name.clone())
            .unwrap_or_default())
    }

    /// Gets the number of frames inside the current frame.
    pub async fn frame_count(&self) -> Result<usize> {
        let tree = self.refresh_frame_tree().await?;
        Ok(tree.children_of(self.current_frame()).count())
    }

    /// Gets the names of the frames inside the current frame, in listing
    /// order; anonymous frames contribute an empty string.
    pub async fn frame_names(&self) -> Result<Vec<String>> {
        let tree = self.refresh_frame_tree().await?;
        Ok(tree
            .children_of(self.current_frame())
            .map(|f| f.name.clone().unwrap_or_default())
            .collect())
    }

    /// Fetches the live frame listing and caches it.
    async fn refresh_frame_tree(&self) -> Result<FrameTree> {
        let result = self
            .dispatch_main(Command::Frame(FrameCommand::List))
            .await?;

        let tree = FrameTree::from_result(&result);
        self.shared.state.lock().frame_tree = Some(tree.clone());
        Ok(tree)
    }
}

// ============================================================================
// Tests
// ============================================================================
