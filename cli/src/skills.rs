use anyhow::Result;
use console::style;
use skillpack_core::config::{self, Scope, SkillPackage, SkillRoots};
use skillpack_core::skills::{
    InstallReport, InstalledSkill, SkillInstaller, SkillRegistry, SkillState, UninstallReport,
};
use std::path::Path;

type RootsFn = fn() -> skillpack_core::Result<SkillRoots>;

pub fn install(package_dir: &Path, scope: Scope) -> Result<()> {
    install_with(package_dir, scope, SkillRoots::detect)
}

pub fn uninstall(package_dir: &Path, scope: Scope) -> Result<()> {
    uninstall_with(package_dir, scope, SkillRoots::detect)
}

fn install_with(package_dir: &Path, scope: Scope, roots: RootsFn) -> Result<()> {
    // The name is unknown until the descriptor loads; fall back to the directory.
    let mut name = fallback_name(package_dir);

    let outcome = (|| -> Result<_> {
        let package = SkillPackage::load(package_dir)?;
        name = package.name().to_string();
        let installer = SkillInstaller::new(roots()?, scope);
        Ok(installer.install(&package)?)
    })();

    match outcome {
        Ok(report) => {
            println!("{}", installed_message(&report));
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", failure_message("install", &name, &e));
            Err(e)
        }
    }
}

fn uninstall_with(package_dir: &Path, scope: Scope, roots: RootsFn) -> Result<()> {
    let mut name = fallback_name(package_dir);

    let outcome = (|| -> Result<_> {
        let descriptor = config::load_descriptor(package_dir)?;
        name = descriptor.name.clone();
        let installer = SkillInstaller::new(roots()?, scope);
        Ok(installer.uninstall(&descriptor)?)
    })();

    match outcome {
        Ok(report) => {
            println!("{}", uninstalled_message(&report));
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", failure_message("uninstall", &name, &e));
            Err(e)
        }
    }
}

pub fn list(scope: Scope) -> Result<()> {
    let registry = match SkillRoots::detect().and_then(|roots| SkillRegistry::load(&roots, scope)) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("{} Failed to list skills: {}", style("✗").red().bold(), e);
            return Err(e.into());
        }
    };

    if !registry.exists() {
        println!(
            "{} No {} skills directory at {}",
            style("!").yellow(),
            scope,
            registry.base_dir().display()
        );
        println!();
        println!("Install one from a skill package:");
        println!("  skillpack --package-dir <dir> install{}", scope_flag(scope));
        return Ok(());
    }

    if registry.count() == 0 {
        println!("{} No {} skills installed", style("!").yellow(), scope);
        return Ok(());
    }

    println!(
        "{} Installed {} skills ({})",
        style("✓").green().bold(),
        scope,
        registry.count()
    );
    println!();

    for skill in registry.list() {
        for line in skill_lines(skill) {
            println!("{}", line);
        }
        println!();
    }

    Ok(())
}

fn installed_message(report: &InstallReport) -> String {
    format!(
        "{} Skill \"{}\" v{} installed to {}",
        style("✓").green().bold(),
        report.name,
        report.version,
        report.path.display()
    )
}

fn uninstalled_message(report: &UninstallReport) -> String {
    format!(
        "{} Skill \"{}\" uninstalled",
        style("✓").green().bold(),
        report.name
    )
}

fn failure_message(action: &str, name: &str, err: &anyhow::Error) -> String {
    format!(
        "{} Failed to {} skill \"{}\": {}",
        style("✗").red().bold(),
        action,
        name,
        err
    )
}

fn skill_lines(skill: &InstalledSkill) -> Vec<String> {
    let entry = skill.entry.as_ref();
    let document = skill.document.as_ref();

    let version = entry
        .and_then(|e| e.version.as_deref())
        .or_else(|| document.and_then(|d| d.version.as_deref()))
        .unwrap_or("?");
    let description = document
        .and_then(|d| d.description.as_deref())
        .unwrap_or("No description");

    let mut lines = vec![format!(
        "  {} {} — {}",
        style(&skill.name).white().bold(),
        style(format!("v{}", version)).dim(),
        description
    )];

    if let Some(package) = entry.and_then(|e| e.package.as_deref()) {
        lines.push(format!("    Package:   {}", package));
    }
    if let Some(installed) = entry.and_then(|e| e.installed.as_deref()) {
        lines.push(format!("    Installed: {}", installed));
    }
    if let Some(doc) = document {
        if !doc.tags.is_empty() {
            lines.push(format!("    Tags:      {}", doc.tags.join(", ")));
        }
        if let Some(author) = &doc.author {
            lines.push(format!("    Author:    {}", author));
        }
    }

    match skill.state {
        SkillState::Installed => {}
        SkillState::Unregistered => {
            lines.push(format!("    {}", style("not registered in manifest").yellow()))
        }
        SkillState::MissingFiles => {
            lines.push(format!("    {}", style("missing files on disk").yellow()))
        }
    }

    lines
}

fn fallback_name(package_dir: &Path) -> String {
    package_dir
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| package_dir.display().to_string())
}

fn scope_flag(scope: Scope) -> &'static str {
    match scope {
        Scope::Global => " --global",
        Scope::Local => "",
    }
}
