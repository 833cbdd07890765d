//! The world coordinator
//!
//! Owns the global variables and functions, the registry of live bugs, the
//! draw log, and the round barrier. Each bug runs on its own OS thread and
//! blocks in [`World::get_permission_to_act`] until the coordinator releases
//! a round; a round is released only once every live bug is blocked again.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::config::WorldConfig;
use crate::dsl::ast::{Allbugs, BugDefinition, FunctionDefinition};
use crate::dsl::evaluator::{Bug, BugState};
use crate::dsl::parser::parse_program;
use crate::error::{BugsError, Result};
use crate::snapshot::{AgentFailure, AgentView, Command, WorldSnapshot, WorldState};

#[derive(Debug)]
struct Participant {
    state: Arc<BugState>,
    blocked: bool,
}

/// Everything guarded by the coordinator lock
#[derive(Debug)]
struct Registry {
    bugs: BTreeMap<String, Participant>,
    commands: Vec<Command>,
    state: WorldState,
    started: bool,
    rounds: u64,
    failures: Vec<AgentFailure>,
    pending: Vec<(Arc<BugState>, Arc<BugDefinition>)>,
    handles: Vec<JoinHandle<()>>,
}

impl Registry {
    fn blocked_count(&self) -> usize {
        self.bugs.values().filter(|p| p.blocked).count()
    }
}

/// Shared world of bugs
pub struct World {
    config: WorldConfig,
    globals: DashMap<String, f64>,
    functions: DashMap<String, Arc<FunctionDefinition>>,
    registry: Mutex<Registry>,
    changed: Condvar,
    delay_ms: AtomicU64,
}

impl World {
    pub fn new(config: WorldConfig) -> Arc<Self> {
        let delay_ms = AtomicU64::new(config.round_delay_ms);
        Arc::new(Self {
            config,
            globals: DashMap::new(),
            functions: DashMap::new(),
            registry: Mutex::new(Registry {
                bugs: BTreeMap::new(),
                commands: Vec::new(),
                state: WorldState::Loaded,
                started: false,
                rounds: 0,
                failures: Vec::new(),
                pending: Vec::new(),
                handles: Vec::new(),
            }),
            changed: Condvar::new(),
            delay_ms,
        })
    }

    /// Parse `source`, then set up globals and bugs. Nothing runs until
    /// [`World::start`].
    pub fn load(source: &str, config: WorldConfig) -> Result<Arc<Self>> {
        let program = parse_program(source)?;
        let world = Self::new(config);
        world.initialize_globals(&program.allbugs);
        world.instantiate_bugs(&program.bugs)?;

        info!(
            bugs = program.bugs.len(),
            globals = world.globals.len(),
            functions = world.functions.len(),
            "World loaded"
        );
        Ok(world)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Declare the `Allbugs` variables (as zero) and functions.
    pub fn initialize_globals(&self, allbugs: &Allbugs) {
        for declaration in &allbugs.variables {
            for name in &declaration.names {
                self.globals.insert(name.clone(), 0.0);
            }
        }
        for function in &allbugs.functions {
            self.functions
                .insert(function.name.clone(), Arc::clone(function));
        }
    }

    /// Register one blocked bug per definition. Fails without registering
    /// anything if two definitions share a name or the world has started.
    pub fn instantiate_bugs(&self, definitions: &[BugDefinition]) -> Result<()> {
        let mut registry = self.registry.lock();
        Self::ensure_not_started(&registry)?;

        let mut seen = std::collections::HashSet::new();
        for definition in definitions {
            if registry.bugs.contains_key(&definition.name) || !seen.insert(&definition.name) {
                return Err(BugsError::DuplicateAgentName(definition.name.clone()));
            }
        }

        for definition in definitions {
            let state = Arc::new(BugState::new(definition.name.clone()));
            for declaration in &definition.variables {
                for name in &declaration.names {
                    state.declare(name);
                }
            }
            registry.bugs.insert(
                definition.name.clone(),
                Participant {
                    state: Arc::clone(&state),
                    blocked: true,
                },
            );
            registry
                .pending
                .push((state, Arc::new(definition.clone())));
        }
        Ok(())
    }

    /// Make a bug visible to lookups and to the round barrier. Only allowed
    /// before [`World::start`].
    pub fn register(&self, state: Arc<BugState>) -> Result<()> {
        let mut registry = self.registry.lock();
        Self::ensure_not_started(&registry)?;
        if registry.bugs.contains_key(state.name()) {
            return Err(BugsError::DuplicateAgentName(state.name().to_string()));
        }
        registry.bugs.insert(
            state.name().to_string(),
            Participant {
                state,
                blocked: true,
            },
        );
        self.changed.notify_all();
        Ok(())
    }

    /// Start one thread per instantiated bug.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let pending = {
            let mut registry = self.registry.lock();
            if registry.started {
                return Err(BugsError::InvalidState(
                    "world has already been started".to_string(),
                ));
            }
            registry.started = true;
            registry.state = if registry.bugs.is_empty() {
                WorldState::Finished
            } else if self.config.start_paused {
                WorldState::Paused
            } else {
                WorldState::Running
            };
            std::mem::take(&mut registry.pending)
        };

        info!(bugs = pending.len(), "Starting world");

        let mut handles = Vec::with_capacity(pending.len());
        for (state, definition) in pending {
            let name = state.name().to_string();
            let world = Arc::clone(self);
            let spawned = thread::Builder::new()
                .name(format!("bug-{}", name))
                .stack_size(self.config.agent_stack_size)
                .spawn(move || world.run_bug(state, &definition));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!(bug = %name, error = %e, "Failed to spawn bug thread");
                    self.record_failure(&name, &BugsError::InvalidState(e.to_string()));
                    self.terminate_bug(&name);
                }
            }
        }

        self.registry.lock().handles.extend(handles);
        Ok(())
    }

    /// Body of a bug thread.
    fn run_bug(self: Arc<Self>, state: Arc<BugState>, definition: &BugDefinition) {
        let departure = Departure {
            world: Arc::clone(&self),
            name: state.name().to_string(),
        };

        let mut bug = Bug::with_state(state, Arc::clone(&self), true);
        bug.define_functions(&definition.functions);
        match bug.run(definition) {
            Ok(()) => debug!(bug = %departure.name, "Bug finished its program"),
            Err(e) => {
                warn!(bug = %departure.name, error = %e, "Bug stopped by runtime error");
                self.record_failure(&departure.name, &e);
            }
        }
    }

    /// Block the calling bug until the current round releases it.
    pub fn get_permission_to_act(&self, name: &str) {
        let mut registry = self.registry.lock();
        while registry.bugs.get(name).is_some_and(|p| p.blocked) {
            self.changed.wait(&mut registry);
        }
    }

    /// Re-block the calling bug after its action.
    pub fn complete_action(&self, name: &str) {
        let mut registry = self.registry.lock();
        if let Some(participant) = registry.bugs.get_mut(name) {
            participant.blocked = true;
        }
        self.changed.notify_all();
    }

    /// Remove a bug from the registry; the world finishes with the last one.
    pub fn terminate_bug(&self, name: &str) {
        let mut registry = self.registry.lock();
        if registry.bugs.remove(name).is_some() {
            debug!(bug = %name, remaining = registry.bugs.len(), "Bug deregistered");
        }
        if registry.started && registry.bugs.is_empty() && registry.state != WorldState::Finished {
            registry.state = WorldState::Finished;
            info!(rounds = registry.rounds, "World finished");
        }
        self.changed.notify_all();
    }

    /// Wait for every live bug to block, then release them all for one
    /// action each. Returns false once no bugs remain.
    fn round_of_actions(&self) -> bool {
        let mut registry = self.registry.lock();
        while !registry.bugs.is_empty() && registry.blocked_count() < registry.bugs.len() {
            self.changed.wait(&mut registry);
        }
        if registry.bugs.is_empty() {
            return false;
        }

        for participant in registry.bugs.values_mut() {
            participant.blocked = false;
        }
        registry.rounds += 1;
        debug!(round = registry.rounds, bugs = registry.bugs.len(), "Round released");
        self.changed.notify_all();
        true
    }

    fn ensure_not_started(registry: &Registry) -> Result<()> {
        if registry.started {
            Err(BugsError::InvalidState(
                "bugs cannot join a world that has already started".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn ensure_started(&self) -> Result<()> {
        if self.registry.lock().started {
            Ok(())
        } else {
            Err(BugsError::InvalidState("world has not been started".to_string()))
        }
    }

    /// Release exactly one round. Ignores the paused flag.
    pub fn run_single_step(&self) -> Result<bool> {
        self.ensure_started()?;
        Ok(self.round_of_actions())
    }

    /// Release rounds with the configured delay between them until every
    /// bug has finished. Rounds are skipped while paused.
    pub fn run_continuously(&self) -> Result<()> {
        self.ensure_started()?;
        while !self.is_finished() {
            thread::sleep(Duration::from_millis(self.delay_ms.load(Ordering::Relaxed)));
            self.wait_while_paused();
            if !self.round_of_actions() {
                break;
            }
        }
        Ok(())
    }

    /// Park the coordinator until the world is resumed or finishes.
    fn wait_while_paused(&self) {
        let mut registry = self.registry.lock();
        while registry.state == WorldState::Paused {
            self.changed.wait(&mut registry);
        }
    }

    /// Run [`World::run_continuously`] on a coordinator thread.
    pub fn spawn_continuous(self: &Arc<Self>) -> Result<JoinHandle<Result<()>>> {
        self.ensure_started()?;
        let world = Arc::clone(self);
        thread::Builder::new()
            .name("bugs-coordinator".to_string())
            .spawn(move || world.run_continuously())
            .map_err(|e| BugsError::InvalidState(e.to_string()))
    }

    /// Block until every live bug is waiting for the next round.
    pub fn wait_until_idle(&self) {
        let mut registry = self.registry.lock();
        while registry.blocked_count() < registry.bugs.len() {
            self.changed.wait(&mut registry);
        }
    }

    pub fn set_paused(&self, paused: bool) {
        let mut registry = self.registry.lock();
        registry.state = match (registry.state, paused) {
            (WorldState::Running, true) => WorldState::Paused,
            (WorldState::Paused, false) => WorldState::Running,
            (state, _) => state,
        };
        self.changed.notify_all();
    }

    /// Flip between running and paused; returns true if now paused.
    pub fn toggle_pause(&self) -> bool {
        let paused = self.state() != WorldState::Paused;
        self.set_paused(paused);
        self.state() == WorldState::Paused
    }

    pub fn set_delay(&self, delay_ms: u64) {
        self.delay_ms.store(delay_ms, Ordering::Relaxed);
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> WorldState {
        self.registry.lock().state
    }

    pub fn is_finished(&self) -> bool {
        self.state() == WorldState::Finished
    }

    pub fn rounds(&self) -> u64 {
        self.registry.lock().rounds
    }

    /// Wait for every bug thread to exit.
    pub fn join_agents(&self) {
        let handles = std::mem::take(&mut self.registry.lock().handles);
        for handle in handles {
            let name = handle.thread().name().unwrap_or("bug").to_string();
            if handle.join().is_err() {
                warn!(thread = %name, "Bug thread panicked");
            }
        }
    }

    pub fn lookup_bug(&self, name: &str) -> Option<Arc<BugState>> {
        self.registry
            .lock()
            .bugs
            .get(name)
            .map(|p| Arc::clone(&p.state))
    }

    pub fn global(&self, name: &str) -> Option<f64> {
        self.globals.get(name).map(|v| *v)
    }

    /// Update an existing global; false if it was never declared.
    pub fn set_global(&self, name: &str, value: f64) -> bool {
        match self.globals.get_mut(name) {
            Some(mut slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn function(&self, name: &str) -> Option<Arc<FunctionDefinition>> {
        self.functions.get(name).map(|f| Arc::clone(&f))
    }

    pub(crate) fn record(&self, command: Command) {
        self.registry.lock().commands.push(command);
    }

    fn record_failure(&self, name: &str, error: &BugsError) {
        self.registry.lock().failures.push(AgentFailure {
            agent: name.to_string(),
            error: error.to_string(),
        });
    }

    /// Live bugs, ordered by name.
    pub fn agents(&self) -> Vec<AgentView> {
        self.registry
            .lock()
            .bugs
            .values()
            .map(|p| p.state.view())
            .collect()
    }

    /// The draw log, oldest first.
    pub fn commands(&self) -> Vec<Command> {
        self.registry.lock().commands.clone()
    }

    pub fn failures(&self) -> Vec<AgentFailure> {
        self.registry.lock().failures.clone()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let registry = self.registry.lock();
        WorldSnapshot {
            state: registry.state,
            rounds: registry.rounds,
            delay_ms: self.delay_ms(),
            agents: registry.bugs.values().map(|p| p.state.view()).collect(),
            commands: registry.commands.clone(),
            failures: registry.failures.clone(),
            taken_at: Utc::now(),
        }
    }
}

/// Deregisters a bug when its thread ends, however it ends.
struct Departure {
    world: Arc<World>,
    name: String,
}

impl Drop for Departure {
    fn drop(&mut self) {
        self.world.terminate_bug(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> WorldConfig {
        WorldConfig {
            round_delay_ms: 0,
            ..WorldConfig::default()
        }
    }

    #[test]
    fn test_load_registers_bugs_and_globals() {
        let world = World::load(
            "Allbugs {\nvar g\ndefine f {\n}\n}\nBug A {\nvar a\nmove 1\n}\nBug B {\nmove 1\n}\n",
            quick(),
        )
        .unwrap();

        assert_eq!(world.state(), WorldState::Loaded);
        assert_eq!(world.global("g"), Some(0.0));
        assert!(world.function("f").is_some());
        assert_eq!(world.lookup_bug("A").unwrap().field("a"), Some(0.0));
        let names: Vec<_> = world.agents().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_duplicate_names_abort_load() {
        let result = World::load("Bug A {\nmove 1\n}\nBug A {\nmove 2\n}\n", quick());
        assert_eq!(
            result.err(),
            Some(BugsError::DuplicateAgentName("A".to_string()))
        );
    }

    #[test]
    fn test_step_before_start_is_rejected() {
        let world = World::load("Bug A {\nmove 1\n}\n", quick()).unwrap();
        assert!(matches!(
            world.run_single_step(),
            Err(BugsError::InvalidState(_))
        ));
        assert!(world.run_continuously().is_err());
    }

    #[test]
    fn test_single_steps_until_finished() {
        let world = World::load("Bug A {\nmove 1\nmove 1\n}\n", quick()).unwrap();
        world.start().unwrap();
        assert!(world.start().is_err());

        assert!(world.run_single_step().unwrap());
        world.wait_until_idle();
        assert_eq!(world.lookup_bug("A").unwrap().x(), 1.0);

        assert!(world.run_single_step().unwrap());
        while world.run_single_step().unwrap() {}

        world.join_agents();
        assert!(world.is_finished());
        assert_eq!(world.commands().len(), 2);
        assert!(!world.run_single_step().unwrap());
    }

    #[test]
    fn test_empty_registry_finishes_on_start() {
        let world = World::new(quick());
        world.start().unwrap();
        assert!(world.is_finished());
    }

    #[test]
    fn test_pause_toggle() {
        let world = World::load("Bug A {\nmove 1\n}\n", quick()).unwrap();
        world.set_paused(true);
        assert_eq!(world.state(), WorldState::Loaded);

        world.start().unwrap();
        assert!(world.toggle_pause());
        assert_eq!(world.state(), WorldState::Paused);
        assert!(!world.toggle_pause());
        assert_eq!(world.state(), WorldState::Running);

        world.set_delay(5);
        assert_eq!(world.delay_ms(), 5);
        world.run_continuously().unwrap();
        world.join_agents();
        assert!(world.is_finished());
    }

    #[test]
    fn test_bugs_cannot_join_after_start() {
        let world = World::load("Bug A {\nmove 1\nmove 1\nmove 1\n}\n", quick()).unwrap();
        world.start().unwrap();

        let late = crate::dsl::parser::parse_bug_definition("Bug Late {\nmove 1\n}\n").unwrap();
        assert!(matches!(
            world.instantiate_bugs(&[late]),
            Err(BugsError::InvalidState(_))
        ));
        assert!(matches!(
            world.register(Arc::new(BugState::new("Other"))),
            Err(BugsError::InvalidState(_))
        ));
        assert!(world.lookup_bug("Late").is_none());

        while world.run_single_step().unwrap() {
            world.wait_until_idle();
        }
        world.join_agents();
        assert!(world.is_finished());
        assert_eq!(world.commands().len(), 3);
    }

    #[test]
    fn test_paused_coordinator_waits_for_resume() {
        let config = WorldConfig {
            start_paused: true,
            ..quick()
        };
        let world = World::load("Bug A {\nmove 1\nmove 1\n}\n", config).unwrap();
        world.start().unwrap();
        assert_eq!(world.state(), WorldState::Paused);

        let coordinator = world.spawn_continuous().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(world.rounds(), 0);
        assert!(world.commands().is_empty());

        world.set_paused(false);
        coordinator.join().unwrap().unwrap();
        world.join_agents();
        assert!(world.is_finished());
        assert_eq!(world.commands().len(), 2);
    }

    #[test]
    fn test_globals_require_declaration() {
        let world = World::new(quick());
        assert!(!world.set_global("g", 1.0));
        world.initialize_globals(&Allbugs {
            variables: vec![crate::dsl::ast::VarDeclaration {
                names: vec!["g".to_string()],
            }],
            functions: vec![],
        });
        assert!(world.set_global("g", 1.0));
        assert_eq!(world.global("g"), Some(1.0));
    }
}
