//! ESTree-shaped AST produced by the external parser
//!
//! The interpreter does not parse source text itself. A host parser (acorn,
//! esprima, espree, ...) emits ESTree JSON and [`Program::from_json`] turns it
//! into shared, read-only nodes. Children are `Rc<Node>` so frames, events and
//! frame metadata can hold on to nodes for the whole run without copying.

use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

use crate::error::JsError;
use crate::value::JsString;

/// Shared reference to a node. Nodes are never mutated after parsing.
pub type NodeRef = Rc<Node>;

/// Line/column position (1-based line, 0-based column, as ESTree)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// Source span of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

/// A single AST node
#[derive(Debug, Deserialize)]
pub struct Node {
    /// Byte offset of the first character
    #[serde(default)]
    pub start: u32,
    /// Byte offset one past the last character
    #[serde(default)]
    pub end: u32,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Node payload, tagged by the ESTree `type` field
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Program {
        body: Vec<NodeRef>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════════
    ExpressionStatement {
        expression: NodeRef,
    },
    BlockStatement {
        body: Vec<NodeRef>,
    },
    EmptyStatement {},
    DebuggerStatement {},
    VariableDeclaration {
        declarations: Vec<NodeRef>,
        kind: VariableKind,
    },
    VariableDeclarator {
        id: NodeRef,
        #[serde(default)]
        init: Option<NodeRef>,
    },
    FunctionDeclaration(Function),
    ClassDeclaration(Class),
    ReturnStatement {
        #[serde(default)]
        argument: Option<NodeRef>,
    },
    IfStatement {
        test: NodeRef,
        consequent: NodeRef,
        #[serde(default)]
        alternate: Option<NodeRef>,
    },
    ForStatement {
        #[serde(default)]
        init: Option<NodeRef>,
        #[serde(default)]
        test: Option<NodeRef>,
        #[serde(default)]
        update: Option<NodeRef>,
        body: NodeRef,
    },
    ForInStatement {
        left: NodeRef,
        right: NodeRef,
        body: NodeRef,
    },
    ForOfStatement {
        left: NodeRef,
        right: NodeRef,
        body: NodeRef,
        #[serde(default, rename = "await")]
        is_await: bool,
    },
    WhileStatement {
        test: NodeRef,
        body: NodeRef,
    },
    DoWhileStatement {
        body: NodeRef,
        test: NodeRef,
    },
    BreakStatement {
        #[serde(default)]
        label: Option<NodeRef>,
    },
    ContinueStatement {
        #[serde(default)]
        label: Option<NodeRef>,
    },
    ThrowStatement {
        argument: NodeRef,
    },
    TryStatement {
        block: NodeRef,
        #[serde(default)]
        handler: Option<NodeRef>,
        #[serde(default)]
        finalizer: Option<NodeRef>,
    },
    CatchClause {
        #[serde(default)]
        param: Option<NodeRef>,
        body: NodeRef,
    },
    SwitchStatement {
        discriminant: NodeRef,
        cases: Vec<NodeRef>,
    },
    SwitchCase {
        #[serde(default)]
        test: Option<NodeRef>,
        consequent: Vec<NodeRef>,
    },
    LabeledStatement {},

    // ═══════════════════════════════════════════════════════════════════════
    // Expressions
    // ═══════════════════════════════════════════════════════════════════════
    Identifier {
        name: JsString,
    },
    Literal {
        #[serde(default)]
        value: serde_json::Value,
        #[serde(default)]
        regex: Option<serde_json::Value>,
    },
    TemplateLiteral {
        quasis: Vec<NodeRef>,
        expressions: Vec<NodeRef>,
    },
    TemplateElement {
        value: TemplateValue,
    },
    ThisExpression {},
    Super {},
    ArrayExpression {
        elements: Vec<Option<NodeRef>>,
    },
    ObjectExpression {
        properties: Vec<NodeRef>,
    },
    Property {
        key: NodeRef,
        value: NodeRef,
        #[serde(default)]
        kind: PropertyKind,
        #[serde(default)]
        computed: bool,
        #[serde(default)]
        shorthand: bool,
    },
    SpreadElement {
        argument: NodeRef,
    },
    FunctionExpression(Function),
    ArrowFunctionExpression(Function),
    ClassExpression(Class),
    ClassBody {
        body: Vec<NodeRef>,
    },
    MethodDefinition {
        key: NodeRef,
        value: NodeRef,
        kind: MethodKind,
        #[serde(default, rename = "static")]
        is_static: bool,
        #[serde(default)]
        computed: bool,
    },
    MemberExpression {
        object: NodeRef,
        property: NodeRef,
        #[serde(default)]
        computed: bool,
        #[serde(default)]
        optional: bool,
    },
    ChainExpression {
        expression: NodeRef,
    },
    CallExpression {
        callee: NodeRef,
        arguments: Vec<NodeRef>,
        #[serde(default)]
        optional: bool,
    },
    NewExpression {
        callee: NodeRef,
        #[serde(default)]
        arguments: Vec<NodeRef>,
    },
    UnaryExpression {
        operator: UnaryOperator,
        argument: NodeRef,
    },
    UpdateExpression {
        operator: UpdateOperator,
        prefix: bool,
        argument: NodeRef,
    },
    BinaryExpression {
        operator: BinaryOperator,
        left: NodeRef,
        right: NodeRef,
    },
    LogicalExpression {
        operator: LogicalOperator,
        left: NodeRef,
        right: NodeRef,
    },
    AssignmentExpression {
        operator: AssignmentOperator,
        left: NodeRef,
        right: NodeRef,
    },
    ConditionalExpression {
        test: NodeRef,
        consequent: NodeRef,
        alternate: NodeRef,
    },
    SequenceExpression {
        expressions: Vec<NodeRef>,
    },
    AwaitExpression {
        argument: NodeRef,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Patterns
    // ═══════════════════════════════════════════════════════════════════════
    ObjectPattern {
        properties: Vec<NodeRef>,
    },
    ArrayPattern {},
    RestElement {
        argument: NodeRef,
    },
    AssignmentPattern {},

    /// Any node type this interpreter has no model for
    #[serde(other)]
    Unsupported,
}

/// Shared shape of function declarations, expressions and arrows
#[derive(Debug, Deserialize)]
pub struct Function {
    #[serde(default)]
    pub id: Option<NodeRef>,
    pub params: Vec<NodeRef>,
    pub body: NodeRef,
    #[serde(default, rename = "async")]
    pub is_async: bool,
    #[serde(default)]
    pub generator: bool,
    /// Arrow function whose body is an expression
    #[serde(default)]
    pub expression: bool,
}

/// Shared shape of class declarations and expressions
#[derive(Debug, Deserialize)]
pub struct Class {
    #[serde(default)]
    pub id: Option<NodeRef>,
    #[serde(default, rename = "superClass")]
    pub super_class: Option<NodeRef>,
    pub body: NodeRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateValue {
    pub raw: String,
    #[serde(default)]
    pub cooked: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    #[default]
    Init,
    Get,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Constructor,
    Method,
    Get,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UnaryOperator {
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "~")]
    BitNot,
    #[serde(rename = "typeof")]
    Typeof,
    #[serde(rename = "void")]
    Void,
    #[serde(rename = "delete")]
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UpdateOperator {
    #[serde(rename = "++")]
    Increment,
    #[serde(rename = "--")]
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "**")]
    Exp,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "===")]
    StrictEq,
    #[serde(rename = "!==")]
    StrictNotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "<<")]
    LShift,
    #[serde(rename = ">>")]
    RShift,
    #[serde(rename = ">>>")]
    URShift,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "instanceof")]
    Instanceof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum LogicalOperator {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "??")]
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AssignmentOperator {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    Add,
    #[serde(rename = "-=")]
    Sub,
    #[serde(rename = "*=")]
    Mul,
    #[serde(rename = "/=")]
    Div,
    #[serde(rename = "%=")]
    Mod,
    #[serde(rename = "**=")]
    Exp,
    #[serde(rename = "&=")]
    BitAnd,
    #[serde(rename = "|=")]
    BitOr,
    #[serde(rename = "^=")]
    BitXor,
    #[serde(rename = "<<=")]
    LShift,
    #[serde(rename = ">>=")]
    RShift,
    #[serde(rename = ">>>=")]
    URShift,
    #[serde(rename = "&&=")]
    And,
    #[serde(rename = "||=")]
    Or,
    #[serde(rename = "??=")]
    Nullish,
}

impl AssignmentOperator {
    /// The binary operator a compound assignment applies, if any
    pub fn binary(self) -> Option<BinaryOperator> {
        Some(match self {
            AssignmentOperator::Add => BinaryOperator::Add,
            AssignmentOperator::Sub => BinaryOperator::Sub,
            AssignmentOperator::Mul => BinaryOperator::Mul,
            AssignmentOperator::Div => BinaryOperator::Div,
            AssignmentOperator::Mod => BinaryOperator::Mod,
            AssignmentOperator::Exp => BinaryOperator::Exp,
            AssignmentOperator::BitAnd => BinaryOperator::BitAnd,
            AssignmentOperator::BitOr => BinaryOperator::BitOr,
            AssignmentOperator::BitXor => BinaryOperator::BitXor,
            AssignmentOperator::LShift => BinaryOperator::LShift,
            AssignmentOperator::RShift => BinaryOperator::RShift,
            AssignmentOperator::URShift => BinaryOperator::URShift,
            AssignmentOperator::Assign
            | AssignmentOperator::And
            | AssignmentOperator::Or
            | AssignmentOperator::Nullish => return None,
        })
    }

    /// The short-circuit operator of a logical assignment, if any
    pub fn logical(self) -> Option<LogicalOperator> {
        match self {
            AssignmentOperator::And => Some(LogicalOperator::And),
            AssignmentOperator::Or => Some(LogicalOperator::Or),
            AssignmentOperator::Nullish => Some(LogicalOperator::Nullish),
            _ => None,
        }
    }
}

/// Fieldless node tag, used as the key of the step policy table and in
/// evaluation events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Program,
    ExpressionStatement,
    BlockStatement,
    EmptyStatement,
    DebuggerStatement,
    VariableDeclaration,
    VariableDeclarator,
    FunctionDeclaration,
    ClassDeclaration,
    ReturnStatement,
    IfStatement,
    ForStatement,
    ForInStatement,
    ForOfStatement,
    WhileStatement,
    DoWhileStatement,
    BreakStatement,
    ContinueStatement,
    ThrowStatement,
    TryStatement,
    CatchClause,
    SwitchStatement,
    SwitchCase,
    LabeledStatement,
    Identifier,
    Literal,
    TemplateLiteral,
    TemplateElement,
    ThisExpression,
    Super,
    ArrayExpression,
    ObjectExpression,
    Property,
    SpreadElement,
    FunctionExpression,
    ArrowFunctionExpression,
    ClassExpression,
    ClassBody,
    MethodDefinition,
    MemberExpression,
    ChainExpression,
    CallExpression,
    NewExpression,
    UnaryExpression,
    UpdateExpression,
    BinaryExpression,
    LogicalExpression,
    AssignmentExpression,
    ConditionalExpression,
    SequenceExpression,
    AwaitExpression,
    ObjectPattern,
    ArrayPattern,
    RestElement,
    AssignmentPattern,
    Unsupported,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Program => "Program",
            NodeType::ExpressionStatement => "ExpressionStatement",
            NodeType::BlockStatement => "BlockStatement",
            NodeType::EmptyStatement => "EmptyStatement",
            NodeType::DebuggerStatement => "DebuggerStatement",
            NodeType::VariableDeclaration => "VariableDeclaration",
            NodeType::VariableDeclarator => "VariableDeclarator",
            NodeType::FunctionDeclaration => "FunctionDeclaration",
            NodeType::ClassDeclaration => "ClassDeclaration",
            NodeType::ReturnStatement => "ReturnStatement",
            NodeType::IfStatement => "IfStatement",
            NodeType::ForStatement => "ForStatement",
            NodeType::ForInStatement => "ForInStatement",
            NodeType::ForOfStatement => "ForOfStatement",
            NodeType::WhileStatement => "WhileStatement",
            NodeType::DoWhileStatement => "DoWhileStatement",
            NodeType::BreakStatement => "BreakStatement",
            NodeType::ContinueStatement => "ContinueStatement",
            NodeType::ThrowStatement => "ThrowStatement",
            NodeType::TryStatement => "TryStatement",
            NodeType::CatchClause => "CatchClause",
            NodeType::SwitchStatement => "SwitchStatement",
            NodeType::SwitchCase => "SwitchCase",
            NodeType::LabeledStatement => "LabeledStatement",
            NodeType::Identifier => "Identifier",
            NodeType::Literal => "Literal",
            NodeType::TemplateLiteral => "TemplateLiteral",
            NodeType::TemplateElement => "TemplateElement",
            NodeType::ThisExpression => "ThisExpression",
            NodeType::Super => "Super",
            NodeType::ArrayExpression => "ArrayExpression",
            NodeType::ObjectExpression => "ObjectExpression",
            NodeType::Property => "Property",
            NodeType::SpreadElement => "SpreadElement",
            NodeType::FunctionExpression => "FunctionExpression",
            NodeType::ArrowFunctionExpression => "ArrowFunctionExpression",
            NodeType::ClassExpression => "ClassExpression",
            NodeType::ClassBody => "ClassBody",
            NodeType::MethodDefinition => "MethodDefinition",
            NodeType::MemberExpression => "MemberExpression",
            NodeType::ChainExpression => "ChainExpression",
            NodeType::CallExpression => "CallExpression",
            NodeType::NewExpression => "NewExpression",
            NodeType::UnaryExpression => "UnaryExpression",
            NodeType::UpdateExpression => "UpdateExpression",
            NodeType::BinaryExpression => "BinaryExpression",
            NodeType::LogicalExpression => "LogicalExpression",
            NodeType::AssignmentExpression => "AssignmentExpression",
            NodeType::ConditionalExpression => "ConditionalExpression",
            NodeType::SequenceExpression => "SequenceExpression",
            NodeType::AwaitExpression => "AwaitExpression",
            NodeType::ObjectPattern => "ObjectPattern",
            NodeType::ArrayPattern => "ArrayPattern",
            NodeType::RestElement => "RestElement",
            NodeType::AssignmentPattern => "AssignmentPattern",
            NodeType::Unsupported => "Unsupported",
        }
    }

    /// Whether evaluating a node of this type leaves a value behind
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            NodeType::Identifier
                | NodeType::Literal
                | NodeType::TemplateLiteral
                | NodeType::ThisExpression
                | NodeType::ArrayExpression
                | NodeType::ObjectExpression
                | NodeType::SpreadElement
                | NodeType::FunctionExpression
                | NodeType::ArrowFunctionExpression
                | NodeType::ClassExpression
                | NodeType::MemberExpression
                | NodeType::ChainExpression
                | NodeType::CallExpression
                | NodeType::NewExpression
                | NodeType::UnaryExpression
                | NodeType::UpdateExpression
                | NodeType::BinaryExpression
                | NodeType::LogicalExpression
                | NodeType::AssignmentExpression
                | NodeType::ConditionalExpression
                | NodeType::SequenceExpression
                | NodeType::AwaitExpression
        )
    }

    pub fn is_function(self) -> bool {
        matches!(
            self,
            NodeType::FunctionDeclaration
                | NodeType::FunctionExpression
                | NodeType::ArrowFunctionExpression
        )
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            NodeKind::Program { .. } => NodeType::Program,
            NodeKind::ExpressionStatement { .. } => NodeType::ExpressionStatement,
            NodeKind::BlockStatement { .. } => NodeType::BlockStatement,
            NodeKind::EmptyStatement {} => NodeType::EmptyStatement,
            NodeKind::DebuggerStatement {} => NodeType::DebuggerStatement,
            NodeKind::VariableDeclaration { .. } => NodeType::VariableDeclaration,
            NodeKind::VariableDeclarator { .. } => NodeType::VariableDeclarator,
            NodeKind::FunctionDeclaration(_) => NodeType::FunctionDeclaration,
            NodeKind::ClassDeclaration(_) => NodeType::ClassDeclaration,
            NodeKind::ReturnStatement { .. } => NodeType::ReturnStatement,
            NodeKind::IfStatement { .. } => NodeType::IfStatement,
            NodeKind::ForStatement { .. } => NodeType::ForStatement,
            NodeKind::ForInStatement { .. } => NodeType::ForInStatement,
            NodeKind::ForOfStatement { .. } => NodeType::ForOfStatement,
            NodeKind::WhileStatement { .. } => NodeType::WhileStatement,
            NodeKind::DoWhileStatement { .. } => NodeType::DoWhileStatement,
            NodeKind::BreakStatement { .. } => NodeType::BreakStatement,
            NodeKind::ContinueStatement { .. } => NodeType::ContinueStatement,
            NodeKind::ThrowStatement { .. } => NodeType::ThrowStatement,
            NodeKind::TryStatement { .. } => NodeType::TryStatement,
            NodeKind::CatchClause { .. } => NodeType::CatchClause,
            NodeKind::SwitchStatement { .. } => NodeType::SwitchStatement,
            NodeKind::SwitchCase { .. } => NodeType::SwitchCase,
            NodeKind::LabeledStatement {} => NodeType::LabeledStatement,
            NodeKind::Identifier { .. } => NodeType::Identifier,
            NodeKind::Literal { .. } => NodeType::Literal,
            NodeKind::TemplateLiteral { .. } => NodeType::TemplateLiteral,
            NodeKind::TemplateElement { .. } => NodeType::TemplateElement,
            NodeKind::ThisExpression {} => NodeType::ThisExpression,
            NodeKind::Super {} => NodeType::Super,
            NodeKind::ArrayExpression { .. } => NodeType::ArrayExpression,
            NodeKind::ObjectExpression { .. } => NodeType::ObjectExpression,
            NodeKind::Property { .. } => NodeType::Property,
            NodeKind::SpreadElement { .. } => NodeType::SpreadElement,
            NodeKind::FunctionExpression(_) => NodeType::FunctionExpression,
            NodeKind::ArrowFunctionExpression(_) => NodeType::ArrowFunctionExpression,
            NodeKind::ClassExpression(_) => NodeType::ClassExpression,
            NodeKind::ClassBody { .. } => NodeType::ClassBody,
            NodeKind::MethodDefinition { .. } => NodeType::MethodDefinition,
            NodeKind::MemberExpression { .. } => NodeType::MemberExpression,
            NodeKind::ChainExpression { .. } => NodeType::ChainExpression,
            NodeKind::CallExpression { .. } => NodeType::CallExpression,
            NodeKind::NewExpression { .. } => NodeType::NewExpression,
            NodeKind::UnaryExpression { .. } => NodeType::UnaryExpression,
            NodeKind::UpdateExpression { .. } => NodeType::UpdateExpression,
            NodeKind::BinaryExpression { .. } => NodeType::BinaryExpression,
            NodeKind::LogicalExpression { .. } => NodeType::LogicalExpression,
            NodeKind::AssignmentExpression { .. } => NodeType::AssignmentExpression,
            NodeKind::ConditionalExpression { .. } => NodeType::ConditionalExpression,
            NodeKind::SequenceExpression { .. } => NodeType::SequenceExpression,
            NodeKind::AwaitExpression { .. } => NodeType::AwaitExpression,
            NodeKind::ObjectPattern { .. } => NodeType::ObjectPattern,
            NodeKind::ArrayPattern {} => NodeType::ArrayPattern,
            NodeKind::RestElement { .. } => NodeType::RestElement,
            NodeKind::AssignmentPattern {} => NodeType::AssignmentPattern,
            NodeKind::Unsupported => NodeType::Unsupported,
        }
    }

    /// Name of a plain identifier node
    pub fn identifier_name(&self) -> Option<&JsString> {
        match &self.kind {
            NodeKind::Identifier { name } => Some(name),
            _ => None,
        }
    }

    /// Function payload for function declarations, expressions and arrows
    pub fn as_function(&self) -> Option<&Function> {
        match &self.kind {
            NodeKind::FunctionDeclaration(f)
            | NodeKind::FunctionExpression(f)
            | NodeKind::ArrowFunctionExpression(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_arrow(&self) -> bool {
        matches!(self.kind, NodeKind::ArrowFunctionExpression(_))
    }

    /// Byte range `(start, end)` in the source text
    pub fn range(&self) -> (u32, u32) {
        (self.start, self.end)
    }

    /// `(line, column)` of the node start, when the parser emitted locations
    pub fn line_column(&self) -> Option<(u32, u32)> {
        self.loc.map(|loc| (loc.start.line, loc.start.column))
    }
}

/// A parsed program: the root `Program` node
#[derive(Debug, Clone)]
pub struct Program {
    pub root: NodeRef,
}

impl Program {
    /// Deserialize an ESTree JSON document
    pub fn from_json(json: &str) -> Result<Self, JsError> {
        let node: Node = serde_json::from_str(json)
            .map_err(|e| JsError::syntax_error(format!("invalid ESTree JSON: {}", e), 0, 0))?;
        Self::from_node(node)
    }

    /// Build from an already decoded `serde_json::Value`
    pub fn from_value(value: serde_json::Value) -> Result<Self, JsError> {
        let node: Node = serde_json::from_value(value)
            .map_err(|e| JsError::syntax_error(format!("invalid ESTree JSON: {}", e), 0, 0))?;
        Self::from_node(node)
    }

    fn from_node(node: Node) -> Result<Self, JsError> {
        if node.node_type() != NodeType::Program {
            return Err(JsError::syntax_error(
                format!("expected a Program root, found {}", node.node_type()),
                0,
                0,
            ));
        }
        Ok(Program {
            root: Rc::new(node),
        })
    }

    /// Top-level statements
    pub fn body(&self) -> &[NodeRef] {
        match &self.root.kind {
            NodeKind::Program { body } => body,
            _ => &[],
        }
    }
}
