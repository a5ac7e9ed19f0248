// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `sysmark cpu|ram|disk|network|all` - Run benchmark categories.
//!
//! Category outcomes, including partial failures and aborts, are reported
//! and exit 0. Only startup failures (config, hardware detection, info
//! snapshot) return an error.

use sysmark_bench::{
    builtin_registry, CategoryReport, JsonReporter, ProcessLauncher, SessionContext,
    SessionCoordinator, SysinfoProvider,
};
use sysmark_core::{Category, WorkloadRegistry};

use crate::display;
use crate::Cli;

/// A coordinator for this host plus the workloads it will run.
pub struct Session {
    pub coordinator: SessionCoordinator,
    pub registry: WorkloadRegistry,
    reporter: Option<JsonReporter>,
}

impl Session {
    pub fn prepare(cli: &Cli) -> anyhow::Result<Self> {
        let config = cli.session_config()?;
        let registry = builtin_registry()?;
        registry.check_config(&config)?;

        let mut context = SessionContext::detect(config)?;
        match ProcessLauncher::current_exe() {
            Ok(launcher) => context = context.with_launcher(launcher),
            Err(e) => tracing::warn!(
                error = %e,
                "Cannot locate own executable, process-scaled workloads will use threads"
            ),
        }

        let reporter = cli.json.as_deref().map(JsonReporter::new).transpose()?;
        let coordinator = SessionCoordinator::new(context, Box::new(SysinfoProvider::new()))?;

        Ok(Self {
            coordinator,
            registry,
            reporter,
        })
    }

    pub fn run_category(&self, category: Category) -> anyhow::Result<CategoryReport> {
        let report = self.coordinator.run_registered(&self.registry, category)?;
        display::print_report(&report);
        self.save(&report);
        Ok(report)
    }

    pub fn run_all(&self) -> anyhow::Result<Vec<CategoryReport>> {
        let reports = self.coordinator.run_all(&self.registry, |report| {
            display::print_report(report);
            self.save(report);
        })?;
        display::print_overview(&reports);
        Ok(reports)
    }

    /// Saving is best effort; a failed write does not discard the run.
    fn save(&self, report: &CategoryReport) {
        if let Some(reporter) = &self.reporter {
            match reporter.save(report) {
                Ok(path) => println!("Report saved to {}", path.display()),
                Err(e) => tracing::error!(error = %e, "Failed to save report"),
            }
        }
    }
}

pub fn category(category: Category, cli: &Cli) -> anyhow::Result<()> {
    let session = Session::prepare(cli)?;
    session.run_category(category)?;
    Ok(())
}

pub fn all(cli: &Cli) -> anyhow::Result<()> {
    let session = Session::prepare(cli)?;
    session.run_all()?;
    Ok(())
}
