//! Then steps for task hierarchy BDD scenarios.

use super::world::{TaskHierarchyWorld, run_async};
use rstest_bdd_macros::then;
use tasktree::task::services::{ListTasksRequest, TaskErrorKind};

#[then("the operation succeeds")]
fn operation_succeeds(world: &TaskHierarchyWorld) -> Result<(), eyre::Report> {
    match world.last_outcome.as_ref() {
        Some(Ok(())) => Ok(()),
        Some(Err(err)) => Err(eyre::eyre!("expected success, got {err}")),
        None => Err(eyre::eyre!("no operation was attempted")),
    }
}

#[then(r#"the operation fails with a validation error mentioning "{text}""#)]
fn operation_fails_with_validation(
    world: &TaskHierarchyWorld,
    text: String,
) -> Result<(), eyre::Report> {
    let err = match world.last_outcome.as_ref() {
        Some(Err(err)) => err,
        Some(Ok(())) => return Err(eyre::eyre!("expected a validation failure, got success")),
        None => return Err(eyre::eyre!("no operation was attempted")),
    };
    eyre::ensure!(
        err.kind() == TaskErrorKind::ValidationFailure,
        "expected a validation failure, got {err:?}"
    );
    eyre::ensure!(
        err.to_string().contains(&text),
        "expected message mentioning {text:?}, got {err}"
    );
    Ok(())
}

#[then("the operation fails with a not found error")]
fn operation_fails_with_not_found(world: &TaskHierarchyWorld) -> Result<(), eyre::Report> {
    match world.last_outcome.as_ref() {
        Some(Err(err)) if err.kind() == TaskErrorKind::NotFound => Ok(()),
        other => Err(eyre::eyre!("expected a not found error, got {other:?}")),
    }
}

#[then(r#"task "{name}" is at hierarchy level {level:usize}"#)]
fn task_is_at_level(
    world: &TaskHierarchyWorld,
    name: String,
    level: usize,
) -> Result<(), eyre::Report> {
    let code = world.code_of(&name)?;
    let view = run_async(world.manager.get_by_code(code.as_str()))?;
    eyre::ensure!(
        view.hierarchy_level == level,
        "expected {name} at level {level}, found {}",
        view.hierarchy_level
    );
    Ok(())
}

#[then(r#"task "{name}" is listed as a child of "{parent}""#)]
fn task_is_child_of(
    world: &TaskHierarchyWorld,
    name: String,
    parent: String,
) -> Result<(), eyre::Report> {
    let code = world.code_of(&name)?;
    let parent_code = world.code_of(&parent)?;
    let children = run_async(world.manager.list_children(parent_code.as_str()))?;
    eyre::ensure!(
        children.iter().any(|child| child.code == code),
        "{name} is not a child of {parent}"
    );
    Ok(())
}

fn is_root(world: &TaskHierarchyWorld, name: &str) -> Result<bool, eyre::Report> {
    let code = world.code_of(name)?;
    let roots = run_async(world.manager.list_roots())?;
    Ok(roots.iter().any(|root| root.code == code))
}

#[then(r#"task "{name}" is not listed among the roots"#)]
fn task_is_not_root(world: &TaskHierarchyWorld, name: String) -> Result<(), eyre::Report> {
    eyre::ensure!(!is_root(world, &name)?, "{name} is listed as a root");
    Ok(())
}

#[then(r#"task "{name}" is listed among the roots"#)]
fn task_is_root(world: &TaskHierarchyWorld, name: String) -> Result<(), eyre::Report> {
    eyre::ensure!(is_root(world, &name)?, "{name} is not listed as a root");
    Ok(())
}

#[then(r#"task "{name}" can no longer be found"#)]
fn task_is_gone(world: &TaskHierarchyWorld, name: String) -> Result<(), eyre::Report> {
    let code = world.code_of(&name)?;
    match run_async(world.manager.get_by_code(code.as_str())) {
        Err(err) if err.kind() == TaskErrorKind::NotFound => Ok(()),
        other => Err(eyre::eyre!("expected {name} to be gone, got {other:?}")),
    }
}

#[then("{count:usize} tasks are stored")]
fn tasks_are_stored(world: &TaskHierarchyWorld, count: usize) -> Result<(), eyre::Report> {
    let page = run_async(world.manager.list(&ListTasksRequest::new()))?;
    eyre::ensure!(
        page.total_items() == u64::try_from(count)?,
        "expected {count} stored tasks, found {}",
        page.total_items()
    );
    Ok(())
}
