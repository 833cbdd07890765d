//! Per-bug tree-walking evaluator
//!
//! A [`Bug`] owns its scope stack and function table and is driven by its
//! own thread. The parts other threads may look at (position, heading,
//! color and the bottom scope frame) live in a shared [`BugState`] that is
//! read without taking the world lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::color::{self, Color};
use crate::dsl::ast::*;
use crate::error::{BugsError, Result};
use crate::snapshot::{AgentView, Command};
use crate::world::World;

/// Tolerance for every equality-sensitive comparison
pub const EPSILON: f64 = 0.001;

/// `a` and `b` differ by no more than [`EPSILON`].
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

/// Numbers double as booleans: true is anything within epsilon of 1.
pub fn is_true(value: f64) -> bool {
    approx_eq(value, 1.0)
}

fn truth(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Apply a binary operator; comparators yield 1 or 0.
pub fn apply_binary(op: BinaryOperator, left: f64, right: f64) -> f64 {
    match op {
        BinaryOperator::Add => left + right,
        BinaryOperator::Subtract => left - right,
        BinaryOperator::Multiply => left * right,
        BinaryOperator::Divide => left / right,
        BinaryOperator::Equal => truth(approx_eq(left, right)),
        BinaryOperator::NotEqual => truth(!approx_eq(left, right)),
        BinaryOperator::Greater => truth(!approx_eq(left, right) && left > right),
        BinaryOperator::Less => truth(!approx_eq(left, right) && left < right),
        BinaryOperator::GreaterOrEqual => truth(approx_eq(left, right) || left > right),
        BinaryOperator::LessOrEqual => truth(approx_eq(left, right) || left < right),
    }
}

/// Map any angle in degrees into `[0, 360)`.
pub fn normalize_angle(degrees: f64) -> f64 {
    let angle = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360
    if angle >= 360.0 {
        0.0
    } else {
        angle
    }
}

/// Observable state of one bug.
///
/// Written only by the owning bug's thread, read by anyone. Numeric fields
/// are `f64` bit patterns in atomics so readers never tear a value.
#[derive(Debug)]
pub struct BugState {
    name: String,
    x: AtomicU64,
    y: AtomicU64,
    angle: AtomicU64,
    color: AtomicU32,
    /// Bottom scope frame, visible through dot notation
    variables: DashMap<String, f64>,
}

impl BugState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            x: AtomicU64::new(0f64.to_bits()),
            y: AtomicU64::new(0f64.to_bits()),
            angle: AtomicU64::new(0f64.to_bits()),
            color: AtomicU32::new(Color::pack(Some(Color::BLACK))),
            variables: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn x(&self) -> f64 {
        f64::from_bits(self.x.load(Ordering::Relaxed))
    }

    pub fn y(&self) -> f64 {
        f64::from_bits(self.y.load(Ordering::Relaxed))
    }

    pub fn angle(&self) -> f64 {
        f64::from_bits(self.angle.load(Ordering::Relaxed))
    }

    pub fn color(&self) -> Option<Color> {
        Color::unpack(self.color.load(Ordering::Relaxed))
    }

    fn set_x(&self, value: f64) {
        self.x.store(value.to_bits(), Ordering::Relaxed);
    }

    fn set_y(&self, value: f64) {
        self.y.store(value.to_bits(), Ordering::Relaxed);
    }

    fn set_angle(&self, value: f64) {
        self.angle.store(value.to_bits(), Ordering::Relaxed);
    }

    fn set_color(&self, color: Option<Color>) {
        self.color.store(Color::pack(color), Ordering::Relaxed);
    }

    /// Declare a bottom-frame variable, initialized to zero.
    pub fn declare(&self, name: &str) {
        self.variables.insert(name.to_string(), 0.0);
    }

    /// Read a field as seen through `Owner.field`.
    pub fn field(&self, field: &str) -> Option<f64> {
        match field {
            "x" => Some(self.x()),
            "y" => Some(self.y()),
            "angle" => Some(self.angle()),
            _ => self.variables.get(field).map(|v| *v),
        }
    }

    fn update_variable(&self, name: &str, value: f64) -> bool {
        match self.variables.get_mut(name) {
            Some(mut slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn view(&self) -> AgentView {
        AgentView {
            name: self.name.clone(),
            x: self.x(),
            y: self.y(),
            angle: self.angle(),
            color: self.color(),
        }
    }
}

/// Outcome of interpreting one statement
#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
    Normal,
    /// Leave the loop with this identity
    Exit(u64),
    Return(f64),
}

/// An action with its arguments already evaluated
#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Move(f64),
    MoveTo(f64, f64),
    Turn(f64),
    TurnTo(f64),
    Line { x1: f64, y1: f64, x2: f64, y2: f64 },
}

/// Control context for one function activation (or the bug body).
#[derive(Debug, Default)]
struct Activation {
    active_loop: Option<u64>,
}

/// Interpreter for a single bug
pub struct Bug {
    state: Arc<BugState>,
    world: Arc<World>,
    /// Function activation frames above the bottom frame
    frames: Vec<HashMap<String, f64>>,
    functions: HashMap<String, Arc<FunctionDefinition>>,
    /// Whether actions wait on the world's round barrier
    gated: bool,
    max_call_depth: usize,
    next_loop_id: u64,
}

impl Bug {
    /// A standalone bug; its actions never wait for permission.
    pub fn new(name: impl Into<String>, world: Arc<World>) -> Self {
        Self::with_state(Arc::new(BugState::new(name)), world, false)
    }

    /// A standalone bug with the variables and functions of `definition`.
    pub fn from_definition(definition: &BugDefinition, world: Arc<World>) -> Self {
        let mut bug = Self::new(definition.name.clone(), world);
        for declaration in &definition.variables {
            bug.declare(declaration);
        }
        bug.define_functions(&definition.functions);
        bug
    }

    pub(crate) fn with_state(state: Arc<BugState>, world: Arc<World>, gated: bool) -> Self {
        let max_call_depth = world.config().max_call_depth;
        Self {
            state,
            world,
            frames: Vec::new(),
            functions: HashMap::new(),
            gated,
            max_call_depth,
            next_loop_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.state.name()
    }

    pub fn state(&self) -> &Arc<BugState> {
        &self.state
    }

    pub fn x(&self) -> f64 {
        self.state.x()
    }

    pub fn y(&self) -> f64 {
        self.state.y()
    }

    pub fn angle(&self) -> f64 {
        self.state.angle()
    }

    pub fn color(&self) -> Option<Color> {
        self.state.color()
    }

    /// Number of scope frames, the bottom frame included.
    pub fn scope_depth(&self) -> usize {
        self.frames.len() + 1
    }

    pub fn define_functions(&mut self, functions: &[Arc<FunctionDefinition>]) {
        for function in functions {
            self.functions
                .insert(function.name.clone(), Arc::clone(function));
        }
    }

    /// Declare variables in the innermost frame.
    pub fn declare(&mut self, declaration: &VarDeclaration) {
        for name in &declaration.names {
            match self.frames.last_mut() {
                Some(frame) => {
                    frame.insert(name.clone(), 0.0);
                }
                None => self.state.declare(name),
            }
        }
    }

    /// Execute the `initially` block, then the body, of `definition`.
    pub fn run(&mut self, definition: &BugDefinition) -> Result<()> {
        let mut activation = Activation::default();
        if let Flow::Return(_) = self.run_block(&definition.initially, &mut activation)? {
            return Ok(());
        }
        self.run_block(&definition.body, &mut activation)?;
        Ok(())
    }

    /// Read a variable: `x`/`y`/`angle`, then the scope stack from the
    /// innermost frame outwards, then the globals.
    pub fn fetch(&self, name: &str) -> Result<f64> {
        match name {
            "x" => return Ok(self.x()),
            "y" => return Ok(self.y()),
            "angle" => return Ok(self.angle()),
            _ => {}
        }
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Ok(*value);
            }
        }
        if let Some(value) = self.state.variables.get(name) {
            return Ok(*value);
        }
        self.world
            .global(name)
            .ok_or_else(|| BugsError::UndeclaredVariable(name.to_string()))
    }

    /// Write a variable, resolved the same way as [`Bug::fetch`].
    pub fn store(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "x" => self.state.set_x(value),
            "y" => self.state.set_y(value),
            "angle" => self.state.set_angle(value),
            _ => return self.store_variable(name, value),
        }
        Ok(())
    }

    fn store_variable(&mut self, name: &str, value: f64) -> Result<()> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        if self.state.update_variable(name, value) || self.world.set_global(name, value) {
            Ok(())
        } else {
            Err(BugsError::UndeclaredVariable(name.to_string()))
        }
    }

    /// Compute the value of an expression.
    pub fn evaluate(&mut self, expression: &Expression) -> Result<f64> {
        match expression {
            Expression::Number(value) => Ok(*value),
            Expression::Variable(name) => self.fetch(name),
            Expression::Dot { owner, field } => {
                let other = self
                    .world
                    .lookup_bug(owner)
                    .ok_or_else(|| BugsError::UnknownAgent(owner.clone()))?;
                other
                    .field(field)
                    .or_else(|| self.world.global(field))
                    .ok_or_else(|| BugsError::UndeclaredVariable(format!("{}.{}", owner, field)))
            }
            Expression::Call(call) => self.call_function(call),
            Expression::Unary { op, operand } => {
                let value = self.evaluate(operand)?;
                Ok(match op {
                    UnaryOperator::Plus => value,
                    UnaryOperator::Minus => -value,
                })
            }
            Expression::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(apply_binary(*op, left, right))
            }
        }
    }

    /// Execute one statement.
    pub fn interpret(&mut self, statement: &Statement) -> Result<()> {
        let mut activation = Activation::default();
        self.execute(statement, &mut activation)?;
        Ok(())
    }

    /// Call a user function, or one of the `distance`/`direction` built-ins.
    pub fn call_function(&mut self, call: &Call) -> Result<f64> {
        match call.name.as_str() {
            "distance" => {
                let (dx, dy) = self.offset_to(call)?;
                return Ok(dx.hypot(dy));
            }
            "direction" => {
                let (dx, dy) = self.offset_to(call)?;
                return Ok(normalize_angle(dy.atan2(dx).to_degrees()));
            }
            _ => {}
        }

        let function = self
            .functions
            .get(&call.name)
            .cloned()
            .or_else(|| self.world.function(&call.name))
            .ok_or_else(|| BugsError::UnknownFunction(call.name.clone()))?;

        if call.args.len() != function.parameters.len() {
            return Err(BugsError::ArityMismatch {
                function: call.name.clone(),
                expected: function.parameters.len(),
                found: call.args.len(),
            });
        }
        if self.frames.len() >= self.max_call_depth {
            return Err(BugsError::RecursionLimit {
                function: call.name.clone(),
                limit: self.max_call_depth,
            });
        }

        // arguments see the caller's frame
        let mut frame = HashMap::with_capacity(call.args.len());
        for (parameter, argument) in function.parameters.iter().zip(&call.args) {
            frame.insert(parameter.clone(), self.evaluate(argument)?);
        }

        self.frames.push(frame);
        let flow = self.run_block(&function.body, &mut Activation::default());
        self.frames.pop();

        match flow? {
            Flow::Return(value) => Ok(value),
            _ => Ok(0.0),
        }
    }

    /// Vector from this bug to the bug named by the single argument of `call`.
    fn offset_to(&self, call: &Call) -> Result<(f64, f64)> {
        let [argument] = call.args.as_slice() else {
            return Err(BugsError::ArityMismatch {
                function: call.name.clone(),
                expected: 1,
                found: call.args.len(),
            });
        };
        let Expression::Variable(other) = argument else {
            return Err(BugsError::UnknownAgent(format!("{:?}", argument)));
        };
        let other = self
            .world
            .lookup_bug(other)
            .ok_or_else(|| BugsError::UnknownAgent(other.clone()))?;
        Ok((other.x() - self.x(), other.y() - self.y()))
    }

    fn run_block(&mut self, block: &Block, activation: &mut Activation) -> Result<Flow> {
        self.run_statements(&block.statements, activation)
    }

    fn run_statements(
        &mut self,
        statements: &[Statement],
        activation: &mut Activation,
    ) -> Result<Flow> {
        for statement in statements {
            let flow = self.execute(statement, activation)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn execute(&mut self, statement: &Statement, activation: &mut Activation) -> Result<Flow> {
        match statement {
            Statement::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.store(name, value)?;
                Ok(Flow::Normal)
            }
            Statement::Loop(body) => {
                self.next_loop_id += 1;
                let id = self.next_loop_id;
                let enclosing = activation.active_loop.replace(id);
                let result = loop {
                    match self.run_block(body, activation) {
                        Ok(Flow::Normal) => continue,
                        Ok(Flow::Exit(target)) if target == id => break Ok(Flow::Normal),
                        other => break other,
                    }
                };
                activation.active_loop = enclosing;
                result
            }
            Statement::ExitIf(guard) => {
                let loop_id = activation.active_loop.ok_or(BugsError::NoEnclosingLoop)?;
                if is_true(self.evaluate(guard)?) {
                    Ok(Flow::Exit(loop_id))
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::Switch(cases) => {
                for case in cases {
                    if is_true(self.evaluate(&case.guard)?) {
                        return self.run_statements(&case.body, activation);
                    }
                }
                Ok(Flow::Normal)
            }
            Statement::Return(value) => Ok(Flow::Return(self.evaluate(value)?)),
            Statement::Do(call) => {
                self.call_function(call)?;
                Ok(Flow::Normal)
            }
            Statement::Color(name) => {
                self.state.set_color(color::lookup(name)?);
                Ok(Flow::Normal)
            }
            Statement::Var(declaration) => {
                self.declare(declaration);
                Ok(Flow::Normal)
            }
            Statement::Initially(block) | Statement::Block(block) => {
                self.run_block(block, activation)
            }
            Statement::Function(function) => {
                self.functions
                    .insert(function.name.clone(), Arc::clone(function));
                Ok(Flow::Normal)
            }
            action => {
                self.act(action)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Perform one observable action inside the round barrier.
    ///
    /// Arguments are evaluated before asking for permission, so any action
    /// reached through a function call in an argument takes its own round.
    fn act(&mut self, statement: &Statement) -> Result<()> {
        let action = self.resolve(statement)?;
        if self.gated {
            self.world.get_permission_to_act(self.name());
        }
        self.perform(action, statement.tag());
        if self.gated {
            self.world.complete_action(self.name());
        }
        Ok(())
    }

    fn resolve(&mut self, statement: &Statement) -> Result<Action> {
        Ok(match statement {
            Statement::Move(distance) => Action::Move(self.evaluate(distance)?),
            Statement::MoveTo { x, y } => Action::MoveTo(self.evaluate(x)?, self.evaluate(y)?),
            Statement::Turn(degrees) => Action::Turn(self.evaluate(degrees)?),
            Statement::TurnTo(degrees) => Action::TurnTo(self.evaluate(degrees)?),
            Statement::Line { x1, y1, x2, y2 } => Action::Line {
                x1: self.evaluate(x1)?,
                y1: self.evaluate(y1)?,
                x2: self.evaluate(x2)?,
                y2: self.evaluate(y2)?,
            },
            other => {
                return Err(BugsError::InvalidState(format!(
                    "'{}' is not an action",
                    other.tag()
                )))
            }
        })
    }

    fn perform(&mut self, action: Action, tag: &str) {
        match action {
            Action::Move(distance) => {
                let radians = self.angle().to_radians();
                let (x1, y1) = (self.x(), self.y());
                let (x2, y2) = (x1 + distance * radians.cos(), y1 + distance * radians.sin());
                self.relocate(x1, y1, x2, y2);
            }
            Action::MoveTo(x2, y2) => self.relocate(self.x(), self.y(), x2, y2),
            Action::Turn(degrees) => {
                self.state.set_angle(normalize_angle(self.angle() + degrees));
            }
            Action::TurnTo(degrees) => self.state.set_angle(normalize_angle(degrees)),
            Action::Line { x1, y1, x2, y2 } => self.world.record(Command {
                x1,
                y1,
                x2,
                y2,
                color: self.color(),
            }),
        }

        trace!(
            bug = %self.name(),
            action = tag,
            x = self.x(),
            y = self.y(),
            angle = self.angle(),
            "Action performed"
        );
    }

    fn relocate(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.state.set_x(x2);
        self.state.set_y(y2);
        self.world.record(Command {
            x1,
            y1,
            x2,
            y2,
            color: self.color(),
        });
    }
}
