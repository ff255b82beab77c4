use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{
    CategoryDetailDto, CategoryResponseDto, CategoryStatsDto, CategoryTreeDto,
};
use crate::features::categories::models::Category;
use crate::features::categories::repositories::CategoryRepository;

/// Assembles flat repository scans into nested tree projections.
///
/// Holds no tree state of its own; every call re-reads the store, so a
/// projection can never be staler than the last committed mutation.
pub struct CategoryTreeBuilder {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryTreeBuilder {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Active ancestors of a node, root first.
    ///
    /// A missing or inactive parent truncates the breadcrumb instead of
    /// failing the request; a visited set stops a broken cyclic chain.
    pub async fn ancestors(&self, node: &Category) -> Result<Vec<CategoryResponseDto>> {
        let mut chain: Vec<Category> = Vec::new();
        let mut visited: HashSet<Uuid> = HashSet::from([node.id]);
        let mut current = node.parent_id;

        while let Some(parent_id) = current {
            if !visited.insert(parent_id) {
                tracing::warn!(
                    "Ancestor chain of category {} revisits {}; truncating",
                    node.id,
                    parent_id
                );
                break;
            }
            match self.repo.find_by_id(parent_id).await? {
                Some(parent) if parent.is_active => {
                    current = parent.parent_id;
                    chain.push(parent);
                }
                _ => break,
            }
        }

        chain.reverse();
        Ok(chain.into_iter().map(Into::into).collect())
    }

    /// Recursive expansion of a node's active descendants.
    ///
    /// Worklist traversal with a visited set instead of recursion: the
    /// depth of the tree never grows the stack, and a node seen twice
    /// (broken data) stops the descent there.
    pub async fn descendants(&self, id: Uuid) -> Result<Vec<CategoryTreeDto>> {
        let mut visited: HashSet<Uuid> = HashSet::from([id]);
        let mut queue: VecDeque<Uuid> = VecDeque::from([id]);
        let mut collected: Vec<Category> = Vec::new();

        while let Some(parent_id) = queue.pop_front() {
            let children = self.repo.find_active_children(Some(parent_id)).await?;
            for child in children {
                if visited.insert(child.id) {
                    queue.push_back(child.id);
                    collected.push(child);
                }
            }
        }

        Ok(assemble(collected))
    }

    /// Every category nested under its parent; nodes whose parent is
    /// not part of the scan become roots.
    pub async fn forest(&self, include_inactive: bool) -> Result<Vec<CategoryTreeDto>> {
        let categories = self.repo.find_all(include_inactive).await?;
        Ok(assemble(categories))
    }

    /// Other active children of the same parent (roots included),
    /// excluding the node itself.
    pub async fn siblings(&self, node: &Category) -> Result<Vec<Category>> {
        let mut siblings = self.repo.find_active_children(node.parent_id).await?;
        siblings.retain(|c| c.id != node.id);
        Ok(siblings)
    }

    /// Resolve an active node by slug and project its full context.
    pub async fn detail_by_slug(&self, slug: &str) -> Result<CategoryDetailDto> {
        let category = self
            .repo
            .find_active_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", slug)))?;

        let ancestors = self.ancestors(&category).await?;
        let descendants = self.descendants(category.id).await?;
        let children = self.repo.find_active_children(Some(category.id)).await?;
        let siblings = self.siblings(&category).await?;

        let total_descendants: i64 = descendants.iter().map(|c| 1 + c.descendant_count()).sum();
        let stats = CategoryStatsDto {
            total_descendants,
            direct_children: children.len() as i64,
            has_children: !children.is_empty(),
            has_siblings: !siblings.is_empty(),
        };

        let category: CategoryResponseDto = category.into();
        let mut breadcrumb = ancestors.clone();
        breadcrumb.push(category.clone());

        Ok(CategoryDetailDto {
            category,
            ancestors,
            breadcrumb,
            children: children.into_iter().map(Into::into).collect(),
            descendants,
            siblings: siblings.into_iter().map(Into::into).collect(),
            stats,
        })
    }
}

/// Link a flat scan into nested trees.
///
/// Nodes group under their parent whenever the parent id is anywhere in
/// the scan; correctness does not depend on the scan order (a stale
/// `level` may sort a child before its parent), only sibling order is
/// kept. Trees materialize with an explicit stack, so depth never grows
/// the call stack, and each node is taken from the index at most once,
/// which bounds the walk even on cyclic data.
fn assemble(categories: Vec<Category>) -> Vec<CategoryTreeDto> {
    let ids: HashSet<Uuid> = categories.iter().map(|c| c.id).collect();
    let mut child_index: HashMap<Uuid, Vec<Category>> = HashMap::new();
    let mut roots: Vec<Category> = Vec::new();
    for category in categories {
        match category.parent_id {
            Some(parent_id) if parent_id != category.id && ids.contains(&parent_id) => {
                child_index.entry(parent_id).or_default().push(category);
            }
            _ => roots.push(category),
        }
    }

    struct Frame {
        node: CategoryTreeDto,
        pending: std::vec::IntoIter<Category>,
    }

    let mut forest: Vec<CategoryTreeDto> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root_iter = roots.into_iter();
    loop {
        // descend into the next pending child, or start the next root
        let next = match stack.last_mut() {
            Some(frame) => frame.pending.next(),
            None => root_iter.next(),
        };
        match next {
            Some(category) => {
                let pending = child_index
                    .remove(&category.id)
                    .unwrap_or_default()
                    .into_iter();
                stack.push(Frame {
                    node: category.into(),
                    pending,
                });
            }
            None => match stack.pop() {
                Some(finished) => match stack.last_mut() {
                    Some(parent) => parent.node.children.push(finished.node),
                    None => forest.push(finished.node),
                },
                None => break,
            },
        }
    }

    forest
}
