//! Frame/flow model
//!
//! Plain data describing what the program has done so far: every stack frame
//! ever created (arena indexed by [`FrameId`]), the block frames opened inside
//! each of them, per-scope bookkeeping ([`FrameMeta`]) and the currently active
//! frame path. The stepping engine mutates it, hosts only read it.

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::ast::NodeRef;
use crate::environment::Environment;
use crate::value::{CheapClone, JsString, JsValue};

/// Lifecycle stage of a single node's evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Enter,
    Value,
    Exit,
    Suspend,
    Resume,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Enter => "enter",
            Phase::Value => "value",
            Phase::Exit => "exit",
            Phase::Suspend => "suspend",
            Phase::Resume => "resume",
        })
    }
}

/// Which control-flow body a block frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    If,
    Else,
    For,
    ForIn,
    ForOf,
    While,
    DoWhile,
}

impl BlockKind {
    pub fn is_loop(self) -> bool {
        !matches!(self, BlockKind::If | BlockKind::Else)
    }
}

/// Identity of a stack frame, monotonic within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a block frame, scoped to its owning stack frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub frame: FrameId,
    pub index: u32,
}

/// Key of the per-scope metadata table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeId {
    Frame(FrameId),
    Block(BlockId),
}

/// Handle to a frame path captured at an await suspension
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PathToken(pub u64);

/// One activation of an interpreted function, or the synthetic program frame
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub id: FrameId,
    /// Display name derived from the callee expression
    pub name: String,
    pub call_site: Option<NodeRef>,
    /// Function node whose body runs in this frame (`None` for the program)
    pub function: Option<NodeRef>,
    pub caller: Option<FrameId>,
    /// Every block frame opened in this frame, in creation order
    pub blocks: Vec<BlockFrame>,
}

#[derive(Debug, Clone)]
pub struct BlockFrame {
    pub id: BlockId,
    pub kind: BlockKind,
    pub node: NodeRef,
}

impl BlockFrame {
    /// Byte range of the block body
    pub fn range(&self) -> (u32, u32) {
        self.node.range()
    }
}

/// An assignment observed while the program ran
#[derive(Debug, Clone)]
pub struct AssignmentRecord {
    pub name: JsString,
    pub node: NodeRef,
    pub value: JsValue,
}

/// Secondary bookkeeping for a frame or block
#[derive(Debug, Clone, Default)]
pub struct FrameMeta {
    /// Identifier -> declaring node
    pub origins: IndexMap<JsString, NodeRef, FxBuildHasher>,
    /// Assignments to identifiers declared in this scope
    pub assignments: Vec<AssignmentRecord>,
    /// Frames called from this scope
    pub calls: Vec<FrameId>,
    /// Blocks opened directly inside this scope
    pub blocks: Vec<BlockId>,
    pub args: Vec<JsValue>,
    pub return_value: Option<JsValue>,
    pub has_returned: bool,
    /// The frame was left by an exception
    pub threw: bool,
}

/// Active frame with its open blocks, innermost last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub frame: FrameId,
    pub blocks: Vec<BlockId>,
}

/// Extra context attached to an evaluation event
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    /// Declaring node of the identifier an assignment writes to
    pub origin: Option<NodeRef>,
    /// Frame created (call enter) or finished (call exit) by this event
    pub call: Option<FrameId>,
    /// Set for block-frame enter/exit events
    pub block_kind: Option<BlockKind>,
    /// Emitted while unwinding (exception, return, break)
    pub abrupt: bool,
}

/// One reported visit to an AST node
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub node: NodeRef,
    pub phase: Phase,
    pub value: Option<JsValue>,
    pub env: Environment,
    pub frame: Option<FrameId>,
    pub block: Option<BlockId>,
    pub context: EvaluationContext,
}

/// Registries of frames, blocks and metadata for one run
#[derive(Debug, Default)]
pub struct FlowModel {
    frames: Vec<StackFrame>,
    meta: FxHashMap<ScopeId, FrameMeta>,
    path: Vec<PathEntry>,
    snapshots: FxHashMap<PathToken, Vec<PathEntry>>,
    next_token: u64,
}

impl FlowModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything recorded for the previous run
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Frames
    // ═══════════════════════════════════════════════════════════════════════

    /// Create a frame and make it the top of the path
    pub fn push_frame(
        &mut self,
        name: impl Into<String>,
        call_site: Option<NodeRef>,
        function: Option<NodeRef>,
        args: Vec<JsValue>,
    ) -> FrameId {
        let id = FrameId(self.frames.len() as u32);
        let caller = self.current_frame();
        if let Some(scope) = self.current_scope() {
            self.meta.entry(scope).or_default().calls.push(id);
        }
        self.frames.push(StackFrame {
            id,
            name: name.into(),
            call_site,
            function,
            caller,
            blocks: Vec::new(),
        });
        self.meta.insert(
            ScopeId::Frame(id),
            FrameMeta {
                args,
                ..FrameMeta::default()
            },
        );
        self.path.push(PathEntry {
            frame: id,
            blocks: Vec::new(),
        });
        id
    }

    /// Remove the top frame from the path; it stays in the registry
    pub fn pop_frame(&mut self) -> Option<FrameId> {
        self.path.pop().map(|entry| entry.frame)
    }

    pub fn frame(&self, id: FrameId) -> Option<&StackFrame> {
        self.frames.get(id.0 as usize)
    }

    /// All frames of the run, in creation order
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn current_frame(&self) -> Option<FrameId> {
        self.path.last().map(|entry| entry.frame)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Blocks
    // ═══════════════════════════════════════════════════════════════════════

    /// Open a block on the current frame
    pub fn push_block(&mut self, kind: BlockKind, node: NodeRef) -> Option<BlockId> {
        let parent_scope = self.current_scope()?;
        let entry = self.path.last_mut()?;
        let frame = self.frames.get_mut(entry.frame.0 as usize)?;
        let id = BlockId {
            frame: entry.frame,
            index: frame.blocks.len() as u32,
        };
        frame.blocks.push(BlockFrame { id, kind, node });
        entry.blocks.push(id);
        self.meta.entry(parent_scope).or_default().blocks.push(id);
        self.meta.insert(ScopeId::Block(id), FrameMeta::default());
        Some(id)
    }

    /// Close the innermost block of the current frame
    pub fn pop_block(&mut self) -> Option<BlockId> {
        self.path.last_mut()?.blocks.pop()
    }

    pub fn block(&self, id: BlockId) -> Option<&BlockFrame> {
        self.frame(id.frame)?.blocks.get(id.index as usize)
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.path.last()?.blocks.last().copied()
    }

    /// Innermost scope: current block, else current frame
    pub fn current_scope(&self) -> Option<ScopeId> {
        let entry = self.path.last()?;
        Some(match entry.blocks.last() {
            Some(block) => ScopeId::Block(*block),
            None => ScopeId::Frame(entry.frame),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Metadata
    // ═══════════════════════════════════════════════════════════════════════

    pub fn meta(&self, scope: ScopeId) -> Option<&FrameMeta> {
        self.meta.get(&scope)
    }

    pub fn frame_meta(&self, id: FrameId) -> Option<&FrameMeta> {
        self.meta(ScopeId::Frame(id))
    }

    pub fn record_origin(&mut self, scope: ScopeId, name: JsString, node: NodeRef) {
        self.meta.entry(scope).or_default().origins.insert(name, node);
    }

    /// Walk the active path from the innermost block outwards and return the
    /// nearest scope that declared `name`
    pub fn find_origin(&self, name: &str) -> Option<(ScopeId, NodeRef)> {
        for entry in self.path.iter().rev() {
            let scopes = entry
                .blocks
                .iter()
                .rev()
                .map(|block| ScopeId::Block(*block))
                .chain(std::iter::once(ScopeId::Frame(entry.frame)));
            for scope in scopes {
                if let Some(node) = self.meta.get(&scope).and_then(|m| m.origins.get(name)) {
                    return Some((scope, node.cheap_clone()));
                }
            }
        }
        None
    }

    pub fn record_assignment(&mut self, scope: ScopeId, record: AssignmentRecord) {
        self.meta.entry(scope).or_default().assignments.push(record);
    }

    pub fn record_return(&mut self, frame: FrameId, value: Option<JsValue>, threw: bool) {
        let meta = self.meta.entry(ScopeId::Frame(frame)).or_default();
        meta.return_value = value;
        meta.has_returned = !threw;
        meta.threw = threw;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Path snapshots
    // ═══════════════════════════════════════════════════════════════════════

    pub fn path(&self) -> &[PathEntry] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Capture the active path under a fresh token
    pub fn snapshot_path(&mut self) -> PathToken {
        self.next_token += 1;
        let token = PathToken(self.next_token);
        self.snapshots.insert(token, self.path.clone());
        token
    }

    /// Consume a snapshot taken by [`FlowModel::snapshot_path`]
    pub fn take_snapshot(&mut self, token: PathToken) -> Option<Vec<PathEntry>> {
        self.snapshots.remove(&token)
    }

    /// Install `path` as the active path, returning the previous one
    pub fn replace_path(&mut self, path: Vec<PathEntry>) -> Vec<PathEntry> {
        std::mem::replace(&mut self.path, path)
    }

    /// Number of suspensions still waiting to resume
    pub fn pending_snapshots(&self) -> usize {
        self.snapshots.len()
    }
}
