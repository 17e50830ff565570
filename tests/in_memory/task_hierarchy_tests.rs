//! End-to-end hierarchy flows over the in-memory repository.

use super::helpers::{TestManager, create_task, manager};
use rstest::rstest;
use tasktree::task::{
    domain::TaskStatus,
    services::{ListTasksRequest, TaskErrorKind, TaskRequest},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn parent_child_create_query_delete_cycle(manager: TestManager) -> eyre::Result<()> {
    let a = create_task(&manager, "A", None).await?;
    let b = create_task(&manager, "B", Some(a.code.as_str())).await?;
    eyre::ensure!(b.hierarchy_level == 2, "B should sit at level 2");

    let children = manager.list_children(a.code.as_str()).await?;
    eyre::ensure!(
        children.iter().any(|child| child.code == b.code),
        "B should be a child of A"
    );
    let roots = manager.list_roots().await?;
    eyre::ensure!(
        roots.iter().all(|root| root.code != b.code),
        "B should not be a root"
    );

    let blocked = manager.delete(a.code.as_str()).await;
    eyre::ensure!(
        matches!(&blocked, Err(err) if err.kind() == TaskErrorKind::ValidationFailure),
        "deleting A with a child should fail, got {blocked:?}"
    );
    manager.delete(b.code.as_str()).await?;
    manager.delete(a.code.as_str()).await?;

    let remaining = manager.list(&ListTasksRequest::new()).await?;
    eyre::ensure!(remaining.total_items() == 0, "store should be empty");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn five_level_chain_refuses_a_sixth_level(manager: TestManager) -> eyre::Result<()> {
    let mut parent: Option<String> = None;
    for title in ["A", "B", "C", "D", "E"] {
        let created = create_task(&manager, title, parent.as_deref()).await?;
        parent = Some(created.code.to_string());
    }
    let e = parent.ok_or_else(|| eyre::eyre!("chain should not be empty"))?;

    let result = create_task(&manager, "F", Some(e.as_str())).await;

    let Err(err) = result else {
        return Err(eyre::eyre!("creating F below level 5 should fail"));
    };
    eyre::ensure!(err.kind() == TaskErrorKind::ValidationFailure, "{err:?}");
    eyre::ensure!(
        err.to_string().contains("maximum hierarchy level"),
        "unexpected message: {err}"
    );
    let stored = manager.list(&ListTasksRequest::new()).await?;
    eyre::ensure!(stored.total_items() == 5, "F must not be stored");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reparenting_a_branch_keeps_children_attached(manager: TestManager) -> eyre::Result<()> {
    let first_root = create_task(&manager, "First", None).await?;
    let second_root = create_task(&manager, "Second", None).await?;
    let branch = create_task(&manager, "Branch", Some(first_root.code.as_str())).await?;
    let leaf = create_task(&manager, "Leaf", Some(branch.code.as_str())).await?;

    let request = TaskRequest::new("Branch", TaskStatus::InProgress)
        .with_parent_code(second_root.code.as_str());
    let moved = manager.update(branch.code.as_str(), request).await?;

    eyre::ensure!(moved.parent_code.as_ref() == Some(&second_root.code), "moved");
    eyre::ensure!(moved.child_codes == vec![leaf.code.clone()], "leaf follows");
    let old_children = manager.list_children(first_root.code.as_str()).await?;
    eyre::ensure!(old_children.is_empty(), "old parent keeps no children");
    let reloaded_leaf = manager.get_by_code(leaf.code.as_str()).await?;
    eyre::ensure!(reloaded_leaf.hierarchy_level == 3, "leaf stays at level 3");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listing_pages_through_every_task(manager: TestManager) -> eyre::Result<()> {
    for index in 0..7 {
        create_task(&manager, &format!("Task {index}"), None).await?;
    }

    let mut seen = Vec::new();
    for page_number in 0..3 {
        let request = ListTasksRequest::new()
            .with_page(page_number)
            .with_size(3)
            .with_sort_by("code")
            .with_sort_direction("asc");
        let page = manager.list(&request).await?;
        seen.extend(page.into_items().into_iter().map(|view| view.code));
    }

    let mut sorted = seen.clone();
    sorted.sort();
    eyre::ensure!(seen.len() == 7, "every task appears once");
    eyre::ensure!(seen == sorted, "pages follow code order");
    Ok(())
}
