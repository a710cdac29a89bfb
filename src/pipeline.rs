//! Orchestrator: rewrite in parallel, aggregate sequentially, emit in parallel.
//!
//! Phase 2 is the only place global invariants (one plain source per
//! destination) are checked; phases 1 and 3 share no mutable state.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::config::{Config, RewriteRules};
use crate::emitter::{EmitOptions, emit};
use crate::error::ExtractError;
use crate::input::{SourceSpec, discover, load_unit};
use crate::merge::DestinationGroups;
use crate::module_tree::ModuleTree;
use crate::naming::{ModuleKind, is_dunder, last_segment};
use crate::postprocess::run_postprocess;
use crate::rewriter::rewrite;
use crate::utils::{RewrittenUnit, RunSummary, SourceTree};

/// Output of the aggregation barrier.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub groups: DestinationGroups,
    pub tree: ModuleTree,
    pub units: usize,
    pub relocations: usize,
}

/// Run `f` on a dedicated pool of `jobs` workers, or on rayon's global pool.
fn with_pool<T: Send>(
    jobs: Option<usize>,
    f: impl FnOnce() -> T + Send,
) -> Result<T, ExtractError> {
    match jobs {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ExtractError::Config(format!("failed to build worker pool: {e}")))?;
            Ok(pool.install(f))
        }
        None => Ok(f()),
    }
}

/// Empties (or creates) the output directory. Must run after validation.
pub fn prepare_out_dir(out_dir: &Path) -> Result<(), ExtractError> {
    fs::create_dir_all(out_dir).map_err(|e| ExtractError::io(out_dir, e))?;
    let entries = fs::read_dir(out_dir).map_err(|e| ExtractError::io(out_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ExtractError::io(out_dir, e))?;
        let path = entry.path();
        let is_dir = entry
            .file_type()
            .map_err(|e| ExtractError::io(&path, e))?
            .is_dir();
        let removed = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| ExtractError::io(&path, e))?;
    }
    debug!(dir = %out_dir.display(), "cleared output directory");
    Ok(())
}

/// Phase 1: read, parse and rewrite every file. Results keep discovery order.
pub fn rewrite_all(
    specs: &[SourceSpec],
    rules: &RewriteRules,
) -> Result<Vec<RewrittenUnit>, ExtractError> {
    specs
        .par_iter()
        .map(|spec| -> Result<RewrittenUnit, ExtractError> {
            let unit = load_unit(spec)?;
            let output = rewrite(&unit, rules)?;
            Ok(RewrittenUnit {
                tree: SourceTree {
                    origin: unit.src.clone(),
                    code: output.code,
                },
                src: unit.src,
                module: unit.module,
                relocations: output.relocations,
            })
        })
        .collect()
}

/// Phase 2: register destinations, detect duplicates, build the topology.
pub fn aggregate(units: Vec<RewrittenUnit>) -> Result<Aggregate, ExtractError> {
    let mut agg = Aggregate {
        units: units.len(),
        ..Aggregate::default()
    };

    let mut relocated = Vec::with_capacity(units.len());
    for unit in units {
        debug!(module = %unit.module, src = %unit.src.display(), "[src]");
        agg.groups.add_plain(&unit.module, unit.tree)?;
        agg.tree.insert(&unit.module);
        relocated.push((unit.src, unit.relocations));
    }

    for (src, records) in relocated {
        for record in records {
            debug!(
                module = %record.target_module,
                symbol = %record.target_symbol,
                local = %record.local_name,
                import = %record.import,
                src = %src.display(),
                "[export]"
            );
            agg.tree.insert(&record.target_module);
            agg.groups.add_relocated(
                &record.target_module,
                SourceTree {
                    origin: src.clone(),
                    code: record.definition,
                },
            );
            agg.relocations += 1;
        }
    }

    trace!("module topology:\n{}", agg.tree);
    Ok(agg)
}

fn kind_for(tree: &ModuleTree, module: &str) -> ModuleKind {
    let kind = tree.classify(module).unwrap_or(ModuleKind::Leaf);
    if is_dunder(last_segment(module)) {
        debug!(module, "[magic]");
    } else if kind == ModuleKind::Package {
        debug!(module, "[is_init]");
    }
    kind
}

/// Phase 3: merge each destination group and write it out.
pub fn emit_all(
    agg: Aggregate,
    options: EmitOptions<'_>,
) -> Result<Vec<(PathBuf, ModuleKind)>, ExtractError> {
    let Aggregate { groups, tree, .. } = agg;
    let merged = groups.into_merged();
    merged
        .par_iter()
        .map(|module| {
            let kind = kind_for(&tree, &module.module);
            emit(module, kind, options).map(|path| (path, kind))
        })
        .collect()
}

/// Full run: validate, clear the output, three phases, postprocess.
pub fn run(config: &Config) -> Result<RunSummary, ExtractError> {
    config.validate()?;
    prepare_out_dir(&config.out_dir)?;

    let specs = discover(config)?;
    let units = with_pool(config.jobs, || rewrite_all(&specs, &config.rules))??;
    info!(units = units.len(), "rewrite phase finished");

    let agg = aggregate(units)?;
    let (unit_count, relocations) = (agg.units, agg.relocations);
    info!(
        destinations = agg.groups.len(),
        relocations, "aggregation finished"
    );

    let options = EmitOptions {
        out_dir: &config.out_dir,
        save_ast: config.save_ast,
    };
    let written = with_pool(config.jobs, || emit_all(agg, options))??;
    let packages = written
        .iter()
        .filter(|(_, kind)| *kind == ModuleKind::Package)
        .count();
    info!(files = written.len(), packages, "emission finished");

    run_postprocess(&config.out_dir, &config.postprocess)?;

    Ok(RunSummary {
        out_dir: config.out_dir.clone(),
        units: unit_count,
        relocations,
        destinations: written.len(),
        packages,
        leaves: written.len() - packages,
    })
}
