//! Step policy table
//!
//! Declares, per node type and phase, whether the evaluator pauses for the
//! host, reports the event without pausing, or stays silent.

use rustc_hash::FxHashMap;

use crate::ast::NodeType;
use crate::flow::{BlockKind, Phase};

use super::intercept::Site;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Report the event and yield to the host
    Pause,
    /// Report the event and keep going
    Inline,
    /// Do not report
    Skip,
}

/// Actions for the three phases of one node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePolicy {
    pub enter: StepAction,
    pub value: StepAction,
    pub exit: StepAction,
}

impl NodePolicy {
    pub const SILENT: NodePolicy = NodePolicy {
        enter: StepAction::Skip,
        value: StepAction::Skip,
        exit: StepAction::Skip,
    };

    pub const INLINE: NodePolicy = NodePolicy {
        enter: StepAction::Inline,
        value: StepAction::Inline,
        exit: StepAction::Inline,
    };

    /// Pause on entry, report the rest
    pub const PAUSE: NodePolicy = NodePolicy {
        enter: StepAction::Pause,
        value: StepAction::Inline,
        exit: StepAction::Inline,
    };

    /// Whether any phase of the node is reported
    pub fn reports(&self) -> bool {
        self.enter != StepAction::Skip
            || self.value != StepAction::Skip
            || self.exit != StepAction::Skip
    }
}

/// Per-node-kind pause/inline/skip classification
#[derive(Debug, Clone)]
pub struct StepPolicy {
    nodes: FxHashMap<NodeType, NodePolicy>,
    blocks: FxHashMap<BlockKind, NodePolicy>,
    call: NodePolicy,
}

impl Default for StepPolicy {
    fn default() -> Self {
        let mut nodes = FxHashMap::default();
        nodes.insert(NodeType::Program, NodePolicy::INLINE);
        for node_type in [
            NodeType::VariableDeclarator,
            NodeType::AssignmentExpression,
            NodeType::UpdateExpression,
            NodeType::CallExpression,
            NodeType::NewExpression,
            NodeType::ClassDeclaration,
            NodeType::IfStatement,
            NodeType::ForStatement,
            NodeType::ForInStatement,
            NodeType::ForOfStatement,
            NodeType::WhileStatement,
            NodeType::DoWhileStatement,
            NodeType::SwitchStatement,
            NodeType::TryStatement,
            NodeType::ReturnStatement,
            NodeType::ThrowStatement,
            NodeType::BreakStatement,
            NodeType::ContinueStatement,
            NodeType::CatchClause,
            NodeType::DebuggerStatement,
        ] {
            nodes.insert(node_type, NodePolicy::PAUSE);
        }
        // Awaits are reported, the suspension itself is the pause
        nodes.insert(NodeType::AwaitExpression, NodePolicy::INLINE);

        let mut blocks = FxHashMap::default();
        for kind in [
            BlockKind::For,
            BlockKind::ForIn,
            BlockKind::ForOf,
            BlockKind::While,
            BlockKind::DoWhile,
        ] {
            blocks.insert(kind, NodePolicy::PAUSE);
        }
        blocks.insert(BlockKind::If, NodePolicy::INLINE);
        blocks.insert(BlockKind::Else, NodePolicy::INLINE);

        StepPolicy {
            nodes,
            blocks,
            call: NodePolicy::INLINE,
        }
    }
}

impl StepPolicy {
    /// A policy that reports nothing and never pauses
    pub fn silent() -> Self {
        StepPolicy {
            nodes: FxHashMap::default(),
            blocks: FxHashMap::default(),
            call: NodePolicy::SILENT,
        }
    }

    pub fn with_node(mut self, node_type: NodeType, policy: NodePolicy) -> Self {
        self.nodes.insert(node_type, policy);
        self
    }

    pub fn with_block(mut self, kind: BlockKind, policy: NodePolicy) -> Self {
        self.blocks.insert(kind, policy);
        self
    }

    pub fn node(&self, node_type: NodeType) -> NodePolicy {
        self.nodes
            .get(&node_type)
            .copied()
            .unwrap_or(NodePolicy::SILENT)
    }

    fn for_site(&self, node_type: NodeType, site: &Site) -> NodePolicy {
        match site {
            Site::Node => self.node(node_type),
            Site::Block(kind) => self.blocks.get(kind).copied().unwrap_or(NodePolicy::SILENT),
            Site::Call(_) => self.call,
        }
    }

    /// Whether visiting this node emits any event
    pub fn reports(&self, node_type: NodeType, site: &Site) -> bool {
        self.for_site(node_type, site).reports()
    }

    /// Action for one event
    pub fn action(&self, node_type: NodeType, phase: Phase, site: &Site) -> StepAction {
        let policy = self.for_site(node_type, site);
        match phase {
            Phase::Enter => policy.enter,
            Phase::Value => policy.value,
            // A reported node always closes its enter
            Phase::Exit if policy.reports() => match policy.exit {
                StepAction::Skip => StepAction::Inline,
                other => other,
            },
            Phase::Exit => StepAction::Skip,
            Phase::Suspend | Phase::Resume => StepAction::Inline,
        }
    }
}
