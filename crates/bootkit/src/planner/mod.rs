use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::{Error, Result};

pub type TaskId = String;

/// One rendered step of the build. Nothing here is ever executed.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub label: String,
    pub component: String,
    pub phase: String,
    /// Task ids or provide tokens; a trailing `?` marks the dependency optional.
    pub after: Vec<String>,
    pub provides: Vec<String>,
    /// Absolute directory the commands run in.
    pub workdir: Option<String>,
    /// Argument vectors, in order.
    pub commands: Vec<Vec<String>>,
}

impl Task {
    pub fn new(component: &str, phase: &str, label: impl Into<String>) -> Self {
        Self {
            id: format!("{component}.{phase}"),
            label: label.into(),
            component: component.into(),
            phase: phase.into(),
            after: Vec::new(),
            provides: Vec::new(),
            workdir: None,
            commands: Vec::new(),
        }
    }

    pub fn after(mut self, dep: impl Into<String>) -> Self {
        self.after.push(dep.into());
        self
    }

    pub fn provides(mut self, token: impl Into<String>) -> Self {
        self.provides.push(token.into());
        self
    }

    pub fn workdir(mut self, dir: impl Into<String>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn command<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.push(argv.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Default)]
pub struct Plan {
    tasks: BTreeMap<TaskId, Task>,
}

impl Plan {
    pub fn add(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(&task.id) {
            return Err(Error::msg(format!("duplicate task id '{}'", task.id)));
        }
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn provides_index(&self) -> Result<BTreeMap<&str, &str>> {
        let mut out: BTreeMap<&str, &str> = BTreeMap::new();
        for (id, task) in &self.tasks {
            for p in &task.provides {
                if let Some(existing) = out.insert(p.as_str(), id.as_str()) {
                    return Err(Error::msg(format!(
                        "provide token '{}' is produced by both '{}' and '{}'",
                        p, existing, id
                    )));
                }
            }
        }
        Ok(out)
    }

    fn resolve_dep<'a>(
        &'a self,
        provides: &BTreeMap<&'a str, &'a str>,
        dep: &'a str,
    ) -> Result<Option<&'a str>> {
        let (dep, optional) = dep
            .strip_suffix('?')
            .map(|d| (d, true))
            .unwrap_or((dep, false));
        if let Some((id, _)) = self.tasks.get_key_value(dep) {
            return Ok(Some(id.as_str()));
        }
        if let Some(&provider) = provides.get(dep) {
            return Ok(Some(provider));
        }
        if optional {
            Ok(None)
        } else {
            Err(Error::msg(format!("unknown dependency '{}'", dep)))
        }
    }

    fn edges(&self) -> Result<Vec<(&str, &str)>> {
        let provides = self.provides_index()?;
        let mut out = Vec::new();
        for (id, task) in &self.tasks {
            for dep in &task.after {
                let resolved = self.resolve_dep(&provides, dep).map_err(|e| {
                    Error::msg(format!(
                        "task '{}' has invalid dependency '{}': {}",
                        id, dep, e
                    ))
                })?;
                if let Some(dep_id) = resolved {
                    out.push((dep_id, id.as_str()));
                }
            }
        }
        Ok(out)
    }

    /// Topological order; ties break on task id so the output is stable.
    pub fn ordered(&self) -> Result<Vec<&Task>> {
        let mut incoming: BTreeMap<&str, usize> =
            self.tasks.keys().map(|k| (k.as_str(), 0)).collect();
        let mut outgoing: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        for (from, to) in self.edges()? {
            if !outgoing.entry(from).or_default().insert(to) {
                continue;
            }
            if let Some(n) = incoming.get_mut(to) {
                *n += 1;
            }
        }

        let mut q: VecDeque<&str> = incoming
            .iter()
            .filter_map(|(k, v)| (*v == 0).then_some(*k))
            .collect();
        let mut out: Vec<&Task> = Vec::with_capacity(self.tasks.len());

        while let Some(n) = q.pop_front() {
            if let Some(task) = self.tasks.get(n) {
                out.push(task);
            }
            for &m in outgoing.get(n).into_iter().flatten() {
                if let Some(slot) = incoming.get_mut(m) {
                    *slot -= 1;
                    if *slot == 0 {
                        q.push_back(m);
                    }
                }
            }
        }

        if out.len() != self.tasks.len() {
            let remaining: Vec<&str> = incoming
                .iter()
                .filter_map(|(k, v)| (*v > 0).then_some(*k))
                .collect();
            return Err(Error::msg(format!(
                "task graph contains a cycle; remaining nodes: {}",
                remaining.join(", ")
            )));
        }
        Ok(out)
    }

    pub fn to_dot(&self) -> Result<String> {
        let mut out = String::from("digraph plan {\n  rankdir=LR;\n");
        for task in self.tasks.values() {
            out.push_str(&format!(
                "  \"{}\" [label=\"{}\\n{}:{}\"];\n",
                task.id, task.label, task.component, task.phase
            ));
        }
        for (from, to) in self.edges()? {
            out.push_str(&format!("  \"{}\" -> \"{}\";\n", from, to));
        }
        out.push_str("}\n");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_dependencies_and_provide_tokens() {
        let mut plan = Plan::default();
        plan.add(Task::new("b", "build", "B").after("src:a")).unwrap();
        plan.add(Task::new("a", "fetch", "A").provides("src:a")).unwrap();
        let ids: Vec<_> = plan.ordered().unwrap().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["a.fetch", "b.build"]);
    }

    #[test]
    fn same_dependency_by_id_and_token_counts_once() {
        let mut plan = Plan::default();
        plan.add(Task::new("a", "fetch", "A").provides("src:a")).unwrap();
        plan.add(Task::new("b", "build", "B").after("a.fetch").after("src:a")).unwrap();
        let ids: Vec<_> = plan.ordered().unwrap().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["a.fetch", "b.build"]);
    }

    #[test]
    fn optional_dependency_may_be_missing() {
        let mut plan = Plan::default();
        plan.add(Task::new("a", "x", "A").after("nothing?")).unwrap();
        assert_eq!(plan.ordered().unwrap().len(), 1);
    }

    #[test]
    fn missing_dependency_is_an_error() {
        let mut plan = Plan::default();
        plan.add(Task::new("a", "x", "A").after("nothing")).unwrap();
        let err = plan.ordered().unwrap_err().to_string();
        assert!(err.contains("unknown dependency 'nothing'"), "unexpected err: {err}");
    }

    #[test]
    fn detects_cycles() {
        let mut plan = Plan::default();
        plan.add(Task::new("a", "x", "A").after("b.x")).unwrap();
        plan.add(Task::new("b", "x", "B").after("a.x")).unwrap();
        let err = plan.ordered().unwrap_err().to_string();
        assert!(err.contains("cycle"), "unexpected err: {err}");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut plan = Plan::default();
        plan.add(Task::new("a", "x", "A")).unwrap();
        assert!(plan.add(Task::new("a", "x", "again")).is_err());
    }
}
