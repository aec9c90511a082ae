//! A scripted compiler engine for driving workers in tests.
//!
//! Each source line is one directive:
//!
//! ```text
//! class p.A extends p.B p.I   declare a class with supertypes
//! interface p.I               declare an interface
//! nested p.A.In extends p.C   member type of the unit's first type
//! module m.core               declare a module
//! sig <anything>              API line, feeds the checksum
//! body <anything>             body line, ignored by the checksum
//! error <message>             report an error while analyzing
//! apt gen/A_.java             annotation processor output
//! fail parse                  parse faults (transient)
//! fail analyze                analyze reports inconsistent state
//! fail fatal                  analyze aborts
//! fail platform               analyze reports a missing platform
//! fail batch                  analyze faults when entered alongside other units
//! oom                         analyze runs out of memory
//! ```
#![allow(dead_code)]

use std::hash::Hasher;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHasher};
use srcindex::base::{Position, TextSize, UnitId};
use srcindex::config::{EngineConfig, PipelineConfig, PrefetchMode};
use srcindex::engine::{
    Checksum, CompilerEngine, DeclaredElement, DiagnosticListener, ElementKind, EngineFactory,
    GeneratedArtifact, ModuleName, ParsedUnit, Severity, TypeGraph, TypeHandle,
};
use srcindex::error::{EngineError, EngineResult};
use srcindex::memory::LowMemoryFlag;
use srcindex::unit::{MemorySourceLoader, SourceUnit, UnitSet};
use tokio_util::sync::CancellationToken;

// ============================================================================
// EVENTS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Create,
    Parse(UnitId),
    Enter(UnitId),
    Analyze(UnitId),
    Generate(UnitId),
}

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub fn count(&self, wanted: impl Fn(&Event) -> bool) -> usize {
        self.0.lock().iter().filter(|e| wanted(e)).count()
    }

    /// Units in the order they were analyzed.
    pub fn analyzed(&self) -> Vec<UnitId> {
        self.0
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Analyze(u) => Some(*u),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, event: Event) -> Option<usize> {
        self.0.lock().iter().position(|e| *e == event)
    }
}

// ============================================================================
// SCRIPT
// ============================================================================

#[derive(Clone, Debug)]
pub struct TypeDecl {
    pub name: TypeHandle,
    pub kind: Option<ElementKind>,
    pub supers: Vec<TypeHandle>,
    pub nested_in: Option<TypeHandle>,
}

/// The parse tree of one scripted unit.
#[derive(Clone, Debug, Default)]
pub struct Script {
    pub types: Vec<TypeDecl>,
    pub module: Option<String>,
    pub signature: Vec<String>,
    pub errors: Vec<String>,
    pub apt: Vec<PathBuf>,
    pub fail_parse: bool,
    pub fail_analyze: bool,
    pub fail_fatal: bool,
    pub fail_platform: bool,
    pub fail_batch: bool,
    pub oom: bool,
}

impl Script {
    pub fn parse(text: &str) -> Script {
        let mut script = Script::default();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
            match head {
                "class" | "interface" | "nested" => {
                    let mut words = rest.split_whitespace();
                    let name = TypeHandle::new(words.next().unwrap_or("Anonymous"));
                    let supers = words
                        .skip_while(|w| *w == "extends")
                        .map(TypeHandle::new)
                        .collect();
                    let kind = match head {
                        "interface" => ElementKind::Interface,
                        _ => ElementKind::Class,
                    };
                    let nested_in = (head == "nested")
                        .then(|| script.types.first().map(|t| t.name.clone()))
                        .flatten();
                    script.types.push(TypeDecl {
                        name,
                        kind: Some(kind),
                        supers,
                        nested_in,
                    });
                    script.signature.push(line.to_string());
                }
                "module" => {
                    script.module = Some(rest.to_string());
                    script.signature.push(line.to_string());
                }
                "sig" => script.signature.push(line.to_string()),
                "body" => {}
                "error" => script.errors.push(rest.to_string()),
                "apt" => script.apt.push(PathBuf::from(rest)),
                "oom" => script.oom = true,
                "fail" => match rest {
                    "parse" => script.fail_parse = true,
                    "analyze" => script.fail_analyze = true,
                    "fatal" => script.fail_fatal = true,
                    "platform" => script.fail_platform = true,
                    "batch" => script.fail_batch = true,
                    other => panic!("unknown failure directive {other}"),
                },
                other => panic!("unknown directive {other}"),
            }
        }
        script
    }

    fn top_level(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.iter().filter(|t| t.nested_in.is_none())
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Hooks that fire after a number of units have been generated, or for
/// `cancel_after_analyze`, analyzed.
#[derive(Clone, Default)]
pub struct Hooks {
    pub cancel_after: Option<(usize, CancellationToken)>,
    pub low_memory_after: Option<(usize, Arc<LowMemoryFlag>)>,
    pub cancel_after_analyze: Option<(usize, CancellationToken)>,
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    pub log: EventLog,
    pub hooks: Hooks,
    generated: Arc<AtomicUsize>,
    analyzed: Arc<AtomicUsize>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hooks(hooks: Hooks) -> Self {
        Self {
            hooks,
            ..Self::default()
        }
    }
}

impl EngineFactory for FakeFactory {
    type Engine = FakeEngine;

    fn create(
        &self,
        _config: &EngineConfig,
        diagnostics: Arc<dyn DiagnosticListener>,
        _cancel: CancellationToken,
    ) -> EngineResult<FakeEngine> {
        self.log.push(Event::Create);
        Ok(FakeEngine {
            log: self.log.clone(),
            hooks: self.hooks.clone(),
            generated: Arc::clone(&self.generated),
            analyzed: Arc::clone(&self.analyzed),
            diagnostics,
            scripts: FxHashMap::default(),
            texts: FxHashMap::default(),
            types: FxHashMap::default(),
            apt: FxHashMap::default(),
        })
    }
}

pub struct FakeEngine {
    log: EventLog,
    hooks: Hooks,
    generated: Arc<AtomicUsize>,
    analyzed: Arc<AtomicUsize>,
    diagnostics: Arc<dyn DiagnosticListener>,
    scripts: FxHashMap<UnitId, Script>,
    texts: FxHashMap<UnitId, Arc<str>>,
    types: FxHashMap<TypeHandle, (UnitId, TypeDecl)>,
    apt: FxHashMap<UnitId, Vec<PathBuf>>,
}

impl FakeEngine {
    fn units_of(elements: &[DeclaredElement]) -> Vec<UnitId> {
        let mut units: Vec<UnitId> = Vec::new();
        for e in elements {
            if !units.contains(&e.unit) {
                units.push(e.unit);
            }
        }
        units
    }
}

impl TypeGraph for FakeEngine {
    fn supertypes(&self, ty: &TypeHandle) -> Vec<TypeHandle> {
        self.types
            .get(ty)
            .map(|(_, decl)| decl.supers.clone())
            .unwrap_or_default()
    }

    fn declaring_unit(&self, ty: &TypeHandle) -> Option<UnitId> {
        self.types.get(ty).map(|(unit, _)| *unit)
    }

    fn nested_types(&self, ty: &TypeHandle) -> Vec<TypeHandle> {
        self.types
            .values()
            .filter(|(_, decl)| decl.nested_in.as_ref() == Some(ty))
            .map(|(_, decl)| decl.name.clone())
            .collect()
    }
}

impl CompilerEngine for FakeEngine {
    type Tree = Script;

    fn parse(&mut self, unit: &SourceUnit, text: &str) -> EngineResult<ParsedUnit<Script>> {
        self.log.push(Event::Parse(unit.id()));
        let script = Script::parse(text);
        if script.fail_parse {
            return Err(EngineError::Internal(format!("parser crashed on {}", unit.path().display())));
        }
        for decl in &script.types {
            self.types
                .insert(decl.name.clone(), (unit.id(), decl.clone()));
        }
        self.texts.insert(unit.id(), Arc::from(text));
        Ok(ParsedUnit {
            unit: unit.clone(),
            declared: script.top_level().map(|t| t.name.clone()).collect(),
            tree: script,
        })
    }

    fn enter(&mut self, units: &[ParsedUnit<Script>]) -> EngineResult<Vec<DeclaredElement>> {
        let mut elements = Vec::new();
        for parsed in units {
            let id = parsed.unit.id();
            self.log.push(Event::Enter(id));
            for decl in parsed.tree.top_level() {
                let kind = decl.kind.unwrap_or(ElementKind::Class);
                elements.push(DeclaredElement::new(id, kind, decl.name.as_str()));
            }
            if let Some(module) = &parsed.tree.module {
                elements.push(DeclaredElement::new(id, ElementKind::Module, module));
            }
            self.scripts.insert(id, parsed.tree.clone());
        }
        Ok(elements)
    }

    fn analyze(&mut self, elements: &[DeclaredElement]) -> EngineResult<()> {
        let units = Self::units_of(elements);
        for &unit in &units {
            self.log.push(Event::Analyze(unit));
            let Some(script) = self.scripts.get(&unit) else {
                return Err(EngineError::Internal(format!("{unit} was never entered")));
            };
            if script.fail_batch && units.len() > 1 {
                return Err(EngineError::Coupling(format!("{unit} confuses the batch")));
            }
            if script.fail_analyze {
                return Err(EngineError::Coupling(format!("symbol table mismatch in {unit}")));
            }
            if script.fail_fatal {
                return Err(EngineError::Fatal(format!("abort in {unit}")));
            }
            if script.fail_platform {
                return Err(EngineError::MissingPlatform("java.lang.Object".into()));
            }
            if script.oom {
                return Err(EngineError::OutOfMemory);
            }
            let text = self.texts.get(&unit).cloned().unwrap_or_else(|| Arc::from(""));
            for message in &script.errors {
                self.diagnostics.record(
                    unit,
                    Severity::Error,
                    message,
                    Position::in_text(&text, TextSize::from(0)),
                );
            }
            if !script.apt.is_empty() {
                self.apt.entry(unit).or_default().extend(script.apt.iter().cloned());
            }

            let count = self.analyzed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((after, token)) = &self.hooks.cancel_after_analyze {
                if count == *after {
                    token.cancel();
                }
            }
        }
        Ok(())
    }

    fn checksum(&self, elements: &[DeclaredElement]) -> Checksum {
        let mut hasher = FxHasher::default();
        for unit in Self::units_of(elements) {
            if let Some(script) = self.scripts.get(&unit) {
                for line in &script.signature {
                    hasher.write(line.as_bytes());
                    hasher.write_u8(b'\n');
                }
            }
        }
        Checksum(hasher.finish())
    }

    fn generate(&mut self, elements: &[DeclaredElement]) -> EngineResult<Vec<GeneratedArtifact>> {
        let mut artifacts = Vec::new();
        for unit in Self::units_of(elements) {
            self.log.push(Event::Generate(unit));
            for element in elements.iter().filter(|e| e.unit == unit) {
                if let Some(ty) = element.type_handle() {
                    artifacts.push(GeneratedArtifact {
                        unit,
                        relative_path: PathBuf::from(format!("{}.sig", ty.as_str().replace('.', "/"))),
                        bytes: Arc::from(ty.as_str().as_bytes()),
                    });
                }
            }

            let count = self.generated.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((after, token)) = &self.hooks.cancel_after {
                if count == *after {
                    token.cancel();
                }
            }
            if let Some((after, flag)) = &self.hooks.low_memory_after {
                if count == *after {
                    flag.raise();
                }
            }
        }
        Ok(artifacts)
    }

    fn owning_module(&self, _unit: UnitId) -> ModuleName {
        self.scripts
            .values()
            .find_map(|s| s.module.as_deref())
            .map(|m| ModuleName::Named(m.into()))
            .unwrap_or(ModuleName::Unnamed)
    }

    fn take_apt_generated(&mut self, unit: UnitId) -> Vec<PathBuf> {
        self.apt.remove(&unit).unwrap_or_default()
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Units backed by in-memory text.
pub struct Sources {
    pub set: Arc<UnitSet>,
    pub loader: Arc<MemorySourceLoader>,
    pub units: Vec<SourceUnit>,
}

impl Sources {
    pub fn new() -> Self {
        Self {
            set: Arc::new(UnitSet::new()),
            loader: Arc::new(MemorySourceLoader::new()),
            units: Vec::new(),
        }
    }

    pub fn add(&mut self, path: &str, text: &str) -> SourceUnit {
        let unit = self.set.unit(path);
        self.loader.insert(unit.id(), text);
        self.units.push(unit.clone());
        unit
    }

    /// Register text for a path without adding it to the batch.
    pub fn stage(&self, path: &str, text: &str) -> SourceUnit {
        let unit = self.set.unit(path);
        self.loader.insert(unit.id(), text);
        unit
    }

    pub fn replace(&self, unit: &SourceUnit, text: &str) {
        self.loader.insert(unit.id(), text);
    }

    pub fn id(&self, index: usize) -> UnitId {
        self.units[index].id()
    }
}

pub fn config() -> PipelineConfig {
    PipelineConfig::default().with_prefetch(PrefetchMode::Sequential)
}

pub fn ty(name: &str) -> TypeHandle {
    TypeHandle::new(name)
}
