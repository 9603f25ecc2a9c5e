use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    fmt::Debug,
    ops::{Deref, DerefMut},
};

use log::trace;

/// Supertrait that collects all the requirements on the NodeReference values
/// Must be copy, comparable and not references (hence 'static)
pub trait NodeReference: Copy + Eq + Debug + 'static {}

pub trait MapTrait {
    /// The type that can be used to reference nodes in the map
    type Reference: NodeReference;

    /// The type that the map uses for storage
    type Storage<T: Default + Copy + Clone + 'static>: MapStorage<T, Reference = Self::Reference>;

    /// Check if the provided node reference lies inside the map
    fn is_valid(&self, node: Self::Reference) -> bool;

    /// Check if the provided node can be stood on. Only called for valid nodes.
    fn is_passable(&self, node: Self::Reference) -> bool;

    /// Return an iterator over the passable neighbors of the provided node and the cost required
    /// to go there
    fn neighbors_of(&self, node: Self::Reference)
        -> impl Iterator<Item = (Self::Reference, usize)>;

    /// Lower bound on the cost of going from `from` to `to`. Must never overestimate, and must be
    /// consistent, for the search to return shortest paths.
    fn heuristic(&self, from: Self::Reference, to: Self::Reference) -> usize;

    /// Create a storage for values of type T
    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T>;
}

pub trait MapStorage<T> {
    type Reference: NodeReference;

    fn get(&self, node: Self::Reference) -> T;
    fn get_mut(&mut self, node: Self::Reference) -> &mut T;
}

/// The objects that we store in the priority queue
#[derive(Debug)]
struct ToVisit<R: Eq> {
    /// cost so far plus the heuristic to the goal
    estimate: usize,
    cost: usize,
    /// insertion counter, earlier entries win ties on `estimate`
    order: u64,
    point: R,
    from: Option<R>,
}

impl<R: Eq> Ord for ToVisit<R> {
    fn cmp(&self, other: &Self) -> Ordering {
        // reverse for BinaryHeap to be a min-heap
        self.estimate
            .cmp(&other.estimate)
            .then(self.order.cmp(&other.order))
            .reverse()
    }
}

impl<R: Eq> PartialOrd for ToVisit<R> {
    fn partial_cmp(&self, other: &ToVisit<R>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<R: Eq> PartialEq for ToVisit<R> {
    fn eq(&self, other: &ToVisit<R>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<R: Eq> Eq for ToVisit<R> {}

#[derive(Clone, Copy, Debug)]
pub struct VisitedItem<R> {
    pub cost: usize,
    pub from: Option<R>,
}

#[derive(Clone, Copy, Debug)]
pub struct Visited<R>(Option<VisitedItem<R>>);

impl<R> Default for Visited<R> {
    fn default() -> Self {
        Visited(None)
    }
}
impl<R> Deref for Visited<R> {
    type Target = Option<VisitedItem<R>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl<R> DerefMut for Visited<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct PathResult<R> {
    /// The steps from `start` (excluded) to `goal` (included)
    pub path: Vec<R>,
    pub start: R,
    pub goal: R,
    pub total_cost: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFinderState<R> {
    Computing,
    NoPathFound,
    PathFound(PathResult<R>),
}

impl<R> PathFinderState<R> {
    pub fn is_done(&self) -> bool {
        !matches!(self, PathFinderState::Computing)
    }
}

/// A* search over any [`MapTrait`], one node expansion per [`PathFinder::step`].
#[derive(Debug)]
pub struct PathFinder<
    R: NodeReference,
    S: MapStorage<Visited<R>, Reference = R>,
    M: MapTrait<Reference = R, Storage<Visited<R>> = S>,
> {
    start: R,
    goal: R,
    visited: S,
    visit_list: BinaryHeap<ToVisit<R>>,
    pushed: u64,
    state: PathFinderState<R>,
    _map: std::marker::PhantomData<M>,
}

impl<
        R: NodeReference,
        S: MapStorage<Visited<R>, Reference = R>,
        M: MapTrait<Reference = R, Storage<Visited<R>> = S>,
    > PathFinder<R, S, M>
{
    pub fn new(map: &M, start: R, goal: R) -> Self {
        let endpoints_usable = [start, goal]
            .iter()
            .all(|&p| map.is_valid(p) && map.is_passable(p));

        let (visit_list, state) = if endpoints_usable {
            (
                BinaryHeap::from([ToVisit {
                    estimate: map.heuristic(start, goal),
                    cost: 0,
                    order: 0,
                    point: start,
                    from: None,
                }]),
                PathFinderState::Computing,
            )
        } else {
            trace!("endpoint {:?} or {:?} is not passable", start, goal);
            (BinaryHeap::new(), PathFinderState::NoPathFound)
        };

        Self {
            start,
            goal,
            visited: map.create_storage::<Visited<R>>(),
            visit_list,
            pushed: 1,
            state,
            _map: std::marker::PhantomData,
        }
    }

    pub fn finish(mut self, map: &M) -> (PathFinderState<R>, S) {
        loop {
            match self.step(map) {
                PathFinderState::Computing => {}
                s => return (s, self.visited),
            }
        }
    }

    pub fn step(&mut self, map: &M) -> PathFinderState<R> {
        if self.state.is_done() {
            return self.state.clone();
        }
        if let Some(visit) = self.visit_list.pop() {
            // stale entry, the node was already expanded through a cheaper route
            if self.visited.get(visit.point).is_some() {
                return self.state.clone();
            }

            *self.visited.get_mut(visit.point) = Visited(Some(VisitedItem {
                cost: visit.cost,
                from: visit.from,
            }));

            if visit.point == self.goal {
                trace!("found goal {:?}: cost={}", self.goal, visit.cost);
                self.state = PathFinderState::PathFound(PathResult {
                    path: self.backtrack(),
                    total_cost: visit.cost,
                    start: self.start,
                    goal: self.goal,
                });
                return self.state.clone();
            }

            for (point, move_cost) in map.neighbors_of(visit.point) {
                if self.visited.get(point).is_none() {
                    let cost = visit.cost + move_cost;
                    self.visit_list.push(ToVisit {
                        estimate: cost + map.heuristic(point, self.goal),
                        cost,
                        order: self.pushed,
                        point,
                        from: Some(visit.point),
                    });
                    self.pushed += 1;
                }
            }
        } else {
            self.state = PathFinderState::NoPathFound;
        }

        self.state.clone()
    }

    /// Walk the `from` links back from the goal. The start has no `from` and is left out.
    fn backtrack(&self) -> Vec<R> {
        let mut path = Vec::new();
        let mut node = self.goal;
        while let Some(VisitedItem {
            from: Some(from), ..
        }) = *self.visited.get(node)
        {
            path.push(node);
            node = from;
        }
        path.reverse();
        path
    }

    pub fn state(&self) -> &PathFinderState<R> {
        &self.state
    }
}

/// Run a full search and return the steps from `start` (excluded) to `goal` (included).
///
/// An empty vector means there is no path, or that `start == goal`. Use [`PathFinder`] directly
/// to tell those apart.
pub fn find_path<M>(map: &M, start: M::Reference, goal: M::Reference) -> Vec<M::Reference>
where
    M: MapTrait,
{
    let finder = PathFinder::<M::Reference, M::Storage<Visited<M::Reference>>, M>::new(
        map, start, goal,
    );
    match finder.finish(map).0 {
        PathFinderState::PathFound(result) => result.path,
        _ => Vec::new(),
    }
}
