use crate::{
    ComputedStyle, DomError, Fragment, HostDom, Layout, MutationRecord, NodeId, Rect, Viewport,
};

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
    layout: Layout,
    style: ComputedStyle,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn element(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            text: None,
            layout: Layout::default(),
            style: ComputedStyle::default(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Arena-backed document with embedder-supplied layout.
///
/// Geometry is never recomputed: whatever [`MemoryDom::set_layout`] stored is
/// what [`HostDom::layout`] reports, even after the node moves. Detached nodes
/// stay in the arena so their handles remain usable.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<NodeData>,
    root: NodeId,
    viewport: Viewport,
    path: String,
    observed: Option<NodeId>,
    records: Vec<MutationRecord>,
}

impl MemoryDom {
    /// Creates a document whose root `body` fills the viewport.
    pub fn new(viewport: Viewport, path: impl Into<String>) -> Self {
        let mut body = NodeData::element("body");
        body.layout = Layout::from_rect(Rect::new(0.0, 0.0, viewport.width, viewport.height));
        Self {
            nodes: vec![body],
            root: NodeId(0),
            viewport,
            path: path.into(),
            observed: None,
            records: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Creates an element with the given class and appends it to `parent`.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        class: &str,
    ) -> Result<NodeId, DomError> {
        let node = self.create_element(tag);
        if !class.is_empty() {
            self.set_attribute(node, "class", class)?;
        }
        self.insert_before(parent, node, None)?;
        Ok(node)
    }

    pub fn set_layout(&mut self, node: NodeId, layout: Layout) -> Result<(), DomError> {
        self.node_mut(node)?.layout = layout;
        Ok(())
    }

    pub fn set_style(&mut self, node: NodeId, style: ComputedStyle) -> Result<(), DomError> {
        self.node_mut(node)?.style = style;
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Simulates the host application changing its route.
    pub fn set_location_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.node(node)?.text.as_deref()
    }

    pub fn outer_html(&self, node: NodeId) -> Result<String, DomError> {
        Ok(self.serialize(node)?.to_html())
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(DomError::UnknownNode(id))
    }

    /// Pre-order walk starting at `from`. The visitor returns `false` to stop.
    fn walk(&self, from: NodeId, visit: &mut impl FnMut(NodeId) -> bool) -> bool {
        if !visit(from) {
            return false;
        }
        if let Some(data) = self.node(from) {
            for child in &data.children {
                if !self.walk(*child, visit) {
                    return false;
                }
            }
        }
        true
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).and_then(|data| data.parent);
        }
        false
    }

    fn record(&mut self, target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) {
        let Some(observed) = self.observed else {
            return;
        };
        if self.is_inclusive_ancestor(observed, target) {
            self.records.push(MutationRecord {
                target,
                added,
                removed,
            });
        }
    }

    fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
        let parent = self
            .node(node)
            .ok_or(DomError::UnknownNode(node))?
            .parent
            .ok_or(DomError::Detached(node))?;
        self.record(parent, Vec::new(), vec![node]);
        self.node_mut(parent)?.children.retain(|child| *child != node);
        self.node_mut(node)?.parent = None;
        Ok(())
    }

    fn build_fragment(&self, node: NodeId) -> Result<Fragment, DomError> {
        let data = self.node(node).ok_or(DomError::UnknownNode(node))?;
        let children = data
            .children
            .iter()
            .map(|child| self.build_fragment(*child))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Fragment {
            tag: data.tag.clone(),
            attrs: data.attrs.clone(),
            text: data.text.clone(),
            layout: data.layout,
            children,
        })
    }
}

impl HostDom for MemoryDom {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn location_path(&self) -> String {
        self.path.clone()
    }

    fn document_root(&self) -> NodeId {
        self.root
    }

    fn elements_by_tag(&self, tag: &str, limit: usize) -> Vec<NodeId> {
        let mut found = Vec::new();
        if limit == 0 {
            return found;
        }
        self.walk(self.root, &mut |id| {
            if self
                .node(id)
                .is_some_and(|data| data.tag.eq_ignore_ascii_case(tag))
            {
                found.push(id);
            }
            found.len() < limit
        });
        found
    }

    fn elements_with_class_containing(&self, needles: &[String]) -> Vec<NodeId> {
        let needles: Vec<String> = needles
            .iter()
            .filter(|needle| !needle.is_empty())
            .map(|needle| needle.to_ascii_lowercase())
            .collect();
        let mut found = Vec::new();
        if needles.is_empty() {
            return found;
        }
        self.walk(self.root, &mut |id| {
            if let Some(class) = self.node(id).and_then(|data| data.attribute("class")) {
                let class = class.to_ascii_lowercase();
                if needles.iter().any(|needle| class.contains(needle.as_str())) {
                    found.push(id);
                }
            }
            true
        });
        found
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|data| data.tag.as_str())
    }

    fn class_name(&self, node: NodeId) -> &str {
        self.attribute(node, "class").unwrap_or("")
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attribute(name)
    }

    fn layout(&self, node: NodeId) -> Layout {
        self.node(node).map(|data| data.layout).unwrap_or_default()
    }

    fn computed_style(&self, node: NodeId) -> ComputedStyle {
        self.node(node).map(|data| data.style).unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.node(node).is_some() && self.is_inclusive_ancestor(self.root, node)
    }

    fn descendants_by_tag(&self, node: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(node, &mut |id| {
            if id != node
                && self
                    .node(id)
                    .is_some_and(|data| data.tag.eq_ignore_ascii_case(tag))
            {
                found.push(id);
            }
            true
        });
        found
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::element(tag));
        id
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        self.node_mut(node)?.text = Some(text.to_string());
        Ok(())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let data = self.node_mut(node)?;
        match data
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => data.attrs.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let data = self.node_mut(node)?;
        let position = data
            .attrs
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name));
        Ok(position.map(|index| data.attrs.remove(index).1))
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if self.node(parent).is_none() {
            return Err(DomError::UnknownNode(parent));
        }
        if self.node(node).is_none() {
            return Err(DomError::UnknownNode(node));
        }
        if self.is_inclusive_ancestor(node, parent) {
            return Err(DomError::HierarchyCycle { parent, node });
        }

        let reference = match reference {
            Some(r) if r == node => self.next_sibling(node),
            other => other,
        };
        if let Some(r) = reference
            && self.parent(r) != Some(parent)
        {
            return Err(DomError::NotAChild { parent, child: r });
        }

        if self.parent(node).is_some() {
            self.detach(node)?;
        }

        let siblings = &mut self.node_mut(parent)?.children;
        let index = reference
            .and_then(|r| siblings.iter().position(|child| *child == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, node);
        self.node_mut(node)?.parent = Some(parent);
        self.record(parent, vec![node], Vec::new());
        Ok(())
    }

    fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.detach(node)
    }

    fn set_scroll_top(&mut self, node: NodeId, value: f64) -> Result<(), DomError> {
        let layout = &mut self.node_mut(node)?.layout;
        let max = (layout.scroll_height - layout.client_height).max(0.0);
        layout.scroll_top = value.clamp(0.0, max);
        Ok(())
    }

    fn serialize(&self, node: NodeId) -> Result<Fragment, DomError> {
        self.build_fragment(node)
    }

    fn instantiate(&mut self, fragment: &Fragment) -> NodeId {
        let id = self.create_element(&fragment.tag);
        let children: Vec<NodeId> = fragment
            .children
            .iter()
            .map(|child| self.instantiate(child))
            .collect();
        for child in &children {
            if let Some(data) = self.nodes.get_mut(child.index()) {
                data.parent = Some(id);
            }
        }
        if let Some(data) = self.nodes.get_mut(id.index()) {
            data.attrs = fragment.attrs.clone();
            data.text = fragment.text.clone();
            data.layout = fragment.layout;
            data.children = children;
        }
        id
    }

    fn observe(&mut self, root: NodeId) {
        self.observed = Some(root);
    }

    fn disconnect(&mut self) {
        self.observed = None;
        self.records.clear();
    }

    fn observed_root(&self) -> Option<NodeId> {
        self.observed
    }

    fn take_mutation_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (MemoryDom, NodeId, Vec<NodeId>) {
        let mut dom = MemoryDom::new(Viewport::default(), "/c/abc");
        let root = dom.root();
        let list = dom.append_element(root, "div", "list").unwrap();
        let items = (0..3)
            .map(|i| dom.append_element(list, "div", &format!("item-{i}")).unwrap())
            .collect();
        (dom, list, items)
    }

    #[test]
    fn insert_and_remove_preserve_sibling_order() {
        let (mut dom, list, items) = sample();
        dom.remove(items[1]).unwrap();
        assert_eq!(dom.children(list), vec![items[0], items[2]]);
        assert!(!dom.is_connected(items[1]));

        dom.insert_before(list, items[1], Some(items[2])).unwrap();
        assert_eq!(dom.children(list), items);
        assert!(dom.is_connected(items[1]));
        assert_eq!(dom.next_sibling(items[0]), Some(items[1]));
        assert_eq!(dom.next_sibling(items[2]), None);
    }

    #[test]
    fn insert_rejects_cycles_and_foreign_references() {
        let (mut dom, list, items) = sample();
        assert_eq!(
            dom.insert_before(items[0], list, None),
            Err(DomError::HierarchyCycle {
                parent: items[0],
                node: list
            })
        );

        let stray = dom.create_element("div");
        dom.insert_before(list, stray, Some(stray)).unwrap();
        assert_eq!(dom.children(list).last(), Some(&stray));
        let orphan = dom.create_element("div");
        assert!(matches!(
            dom.insert_before(list, orphan, Some(dom.root())),
            Err(DomError::NotAChild { .. })
        ));
        assert_eq!(dom.remove(orphan), Err(DomError::Detached(orphan)));
    }

    #[test]
    fn records_mutations_only_while_observing_subtree() {
        let (mut dom, list, items) = sample();
        dom.remove(items[0]).unwrap();
        assert!(dom.take_mutation_records().is_empty());

        dom.observe(list);
        let fresh = dom.append_element(list, "div", "item-3").unwrap();
        dom.append_element(dom.root(), "div", "footer").unwrap();
        dom.remove(items[2]).unwrap();

        let records = dom.take_mutation_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].added, vec![fresh]);
        assert_eq!(records[1].removed, vec![items[2]]);
        assert!(records.iter().all(|record| record.target == list));

        dom.append_element(list, "div", "item-4").unwrap();
        dom.disconnect();
        assert!(dom.take_mutation_records().is_empty());
    }

    #[test]
    fn queries_follow_document_order_and_limits() {
        let (mut dom, list, items) = sample();
        dom.set_attribute(items[2], "class", "Scroll-Area").unwrap();
        let img = dom.append_element(items[0], "img", "").unwrap();

        assert_eq!(dom.elements_by_tag("div", 2), vec![list, items[0]]);
        assert_eq!(
            dom.elements_with_class_containing(&["scroll".to_string()]),
            vec![items[2]]
        );
        assert_eq!(dom.descendants_by_tag(list, "img"), vec![img]);
        assert!(dom.descendants_by_tag(img, "img").is_empty());
    }

    #[test]
    fn serialize_and_instantiate_copy_the_subtree() {
        let (mut dom, list, items) = sample();
        let img = dom.append_element(items[0], "img", "").unwrap();
        dom.set_attribute(img, "src", "a.png").unwrap();
        dom.set_text(items[0], "hello").unwrap();
        dom.set_layout(items[0], Layout::from_rect(Rect::new(0.0, 0.0, 800.0, 120.0)))
            .unwrap();

        let fragment = dom.serialize(items[0]).unwrap();
        let copy = dom.instantiate(&fragment);
        assert_ne!(copy, items[0]);
        assert!(!dom.is_connected(copy));
        assert_eq!(dom.text(copy), Some("hello"));
        assert!((dom.layout(copy).rect.height - 120.0).abs() < f64::EPSILON);
        let copied_img = dom.descendants_by_tag(copy, "img");
        assert_eq!(copied_img.len(), 1);
        assert_eq!(dom.attribute(copied_img[0], "src"), Some("a.png"));

        dom.insert_before(list, copy, None).unwrap();
        assert_eq!(dom.children(list).last(), Some(&copy));
    }

    #[test]
    fn scroll_top_is_clamped_to_scrollable_range() {
        let (mut dom, list, _) = sample();
        dom.set_layout(
            list,
            Layout::from_rect(Rect::new(0.0, 0.0, 800.0, 1000.0)).with_scroll_height(5000.0),
        )
        .unwrap();
        dom.set_scroll_top(list, 9000.0).unwrap();
        assert!((dom.layout(list).scroll_top - 4000.0).abs() < f64::EPSILON);
        dom.set_scroll_top(list, -5.0).unwrap();
        assert!(dom.layout(list).scroll_top.abs() < f64::EPSILON);
    }
}
