//! Table of action values.
use std::{collections::HashMap, hash::Hash};

#[derive(Debug, Clone, PartialEq)]
struct Cell<A> {
    act: A,
    value: f64,
    visits: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct Row<S, A>
where
    A: Eq + Hash,
{
    state: S,
    index: HashMap<A, usize>,
    cells: Vec<Cell<A>>,
}

/// A table of action values `Q(s, a)` with per-entry update counts.
///
/// States and, within a state, actions are kept in the order they were first
/// inserted, so that iteration over the table is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable<S, A>
where
    S: Eq + Hash,
    A: Eq + Hash,
{
    index: HashMap<S, usize>,
    rows: Vec<Row<S, A>>,
}

impl<S, A> Default for QTable<S, A>
where
    S: Eq + Hash,
    A: Eq + Hash,
{
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }
}

impl<S, A> QTable<S, A>
where
    S: Clone + Eq + Hash,
    A: Clone + Eq + Hash,
{
    /// Constructs an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, s: &S, a: &A) -> Option<&Cell<A>> {
        let row = &self.rows[*self.index.get(s)?];
        row.index.get(a).map(|&pos| &row.cells[pos])
    }

    fn cell_mut_or_insert_with<F>(&mut self, s: &S, a: &A, init: F) -> &mut Cell<A>
    where
        F: FnOnce() -> f64,
    {
        let ix = match self.index.get(s).copied() {
            Some(ix) => ix,
            None => {
                self.rows.push(Row {
                    state: s.clone(),
                    index: HashMap::new(),
                    cells: Vec::new(),
                });
                self.index.insert(s.clone(), self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        let row = &mut self.rows[ix];
        let pos = match row.index.get(a).copied() {
            Some(pos) => pos,
            None => {
                row.cells.push(Cell {
                    act: a.clone(),
                    value: init(),
                    visits: 0,
                });
                row.index.insert(a.clone(), row.cells.len() - 1);
                row.cells.len() - 1
            }
        };
        &mut row.cells[pos]
    }

    /// Returns `Q(s, a)` if the entry exists.
    pub fn get(&self, s: &S, a: &A) -> Option<f64> {
        self.cell(s, a).map(|c| c.value)
    }

    /// Returns `Q(s, a)`, inserting the value given by `init` if the entry is missing.
    pub fn get_or_insert_with<F>(&mut self, s: &S, a: &A, init: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        self.cell_mut_or_insert_with(s, a, init).value
    }

    /// Adds `delta` to `Q(s, a)` and counts the update.
    ///
    /// A missing entry is inserted with the value given by `init` first.
    pub fn update<F>(&mut self, s: &S, a: &A, delta: f64, init: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        let cell = self.cell_mut_or_insert_with(s, a, init);
        cell.value += delta;
        cell.visits += 1;
        cell.value
    }

    /// The number of updates applied to `Q(s, a)`.
    pub fn visits(&self, s: &S, a: &A) -> usize {
        self.cell(s, a).map_or(0, |c| c.visits)
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).sum()
    }

    /// Returns `true` if the table has no entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the states in the order of first insertion.
    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.rows.iter().map(|row| &row.state)
    }

    /// Iterates over `(state, action, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (&S, &A, f64)> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter().map(move |c| (&row.state, &c.act, c.value)))
    }

    /// Iterates over `(state, action, update count)`.
    pub fn iter_visits(&self) -> impl Iterator<Item = (&S, &A, usize)> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter().map(move |c| (&row.state, &c.act, c.visits)))
    }
}
