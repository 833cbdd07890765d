//! Abstract Syntax Tree definitions for the Bugs language
//!
//! Trees are built once by the parser and never mutated afterwards.
//! Function definitions are reference counted so every bug and every
//! call shares the same body.

use std::fmt;
use std::sync::Arc;

/// Root node: an optional `Allbugs` section followed by bug definitions
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub allbugs: Allbugs,
    pub bugs: Vec<BugDefinition>,
}

/// Program-wide variables and functions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Allbugs {
    pub variables: Vec<VarDeclaration>,
    pub functions: Vec<Arc<FunctionDefinition>>,
}

/// `var a, b, c`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclaration {
    pub names: Vec<String>,
}

/// `Bug name { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct BugDefinition {
    pub name: String,
    pub variables: Vec<VarDeclaration>,
    /// Empty when the definition has no `initially` block
    pub initially: Block,
    pub body: Block,
    pub functions: Vec<Arc<FunctionDefinition>>,
}

/// `define name using p1, p2 { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Anything a bug can interpret
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    // actions
    Move(Expression),
    MoveTo {
        x: Expression,
        y: Expression,
    },
    Turn(Expression),
    TurnTo(Expression),
    Line {
        x1: Expression,
        y1: Expression,
        x2: Expression,
        y2: Expression,
    },

    // statements
    Assign {
        name: String,
        value: Expression,
    },
    Loop(Block),
    ExitIf(Expression),
    Switch(Vec<Case>),
    Return(Expression),
    Do(Call),
    Color(String),

    // declarations, only produced outside command position
    Var(VarDeclaration),
    Initially(Block),
    Function(Arc<FunctionDefinition>),
    Block(Block),
}

impl Statement {
    /// Keyword or synthetic tag naming this kind of node.
    pub fn tag(&self) -> &'static str {
        match self {
            Statement::Move(_) => "move",
            Statement::MoveTo { .. } => "moveto",
            Statement::Turn(_) => "turn",
            Statement::TurnTo(_) => "turnto",
            Statement::Line { .. } => "line",
            Statement::Assign { .. } => "assign",
            Statement::Loop(_) => "loop",
            Statement::ExitIf(_) => "exit",
            Statement::Switch(_) => "switch",
            Statement::Return(_) => "return",
            Statement::Do(_) => "call",
            Statement::Color(_) => "color",
            Statement::Var(_) => "var",
            Statement::Initially(_) => "initially",
            Statement::Function(_) => "function",
            Statement::Block(_) => "block",
        }
    }
}

/// One `case` arm of a `switch`
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub guard: Expression,
    pub body: Vec<Statement>,
}

/// `name(arg, ...)`, also the target of `do`
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    Variable(String),
    /// `Owner.field`, a read of another bug
    Dot {
        owner: String,
        field: String,
    },
    Call(Call),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterOrEqual => ">=",
        }
    }

    pub fn is_comparator(&self) -> bool {
        !matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
