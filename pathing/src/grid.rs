use crate::error::GridError;
use crate::find::{MapStorage, MapTrait, NodeReference};
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Traversability tag of a single grid cell
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Road,
    #[default]
    Wall,
}

impl Cell {
    pub fn is_road(self) -> bool {
        self == Cell::Road
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Cell::Wall => "#",
                Cell::Road => ".",
            }
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn manhattan(&self, other: &Point) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl NodeReference for Point {}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// A MapTrait implementation that uses a rectangular grid of cells, stored row by row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridMap {
    rows: usize,
    columns: usize,
    cells: Vec<Cell>,
}

impl GridMap {
    pub fn new(rows: usize, columns: usize, fill: Cell) -> Self {
        Self {
            rows,
            columns,
            cells: vec![fill; rows * columns],
        }
    }

    /// Build a map from cells laid out row by row
    pub fn from_cells(rows: usize, columns: usize, cells: Vec<Cell>) -> Result<Self, GridError> {
        if cells.len() != rows * columns {
            return Err(GridError::CellCount {
                rows,
                columns,
                actual: cells.len(),
            });
        }
        Ok(Self {
            rows,
            columns,
            cells,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn contains(&self, point: Point) -> bool {
        point.row < self.rows && point.col < self.columns
    }

    /// The cell at `point`, or `None` if it lies outside the map
    pub fn get(&self, point: Point) -> Option<Cell> {
        self.contains(point)
            .then(|| self.cells[point.row * self.columns + point.col])
    }

    pub fn is_road(&self, point: Point) -> bool {
        self.get(point).is_some_and(Cell::is_road)
    }

    /// All road cells in row-major order
    pub fn road_cells(&self) -> impl Iterator<Item = Point> + '_ {
        let columns = self.columns;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_road())
            .map(move |(i, _)| Point {
                row: i / columns,
                col: i % columns,
            })
    }

    /// Scales the map by the given factor, i.e. to make it twice as large, pass 2.
    /// Interpolates the cells by repeating the existing cells in the new grid.
    pub fn scale_up(&mut self, factor: usize) {
        let columns = self.columns * factor;
        let mut new_cells = vec![Cell::default(); self.rows * factor * columns];

        for row in 0..self.rows {
            for col in 0..self.columns {
                let cell = self.cells[row * self.columns + col];
                for r in 0..factor {
                    for c in 0..factor {
                        new_cells[(row * factor + r) * columns + col * factor + c] = cell;
                    }
                }
            }
        }

        self.rows *= factor;
        self.columns = columns;
        self.cells = new_cells;
    }
}

/// A MapStorage that keeps one value per grid cell in a single vec
#[derive(Debug)]
pub struct CellStorage<T> {
    columns: usize,
    values: Vec<T>,
}

impl<T: Copy + 'static> MapStorage<T> for CellStorage<T> {
    type Reference = Point;

    fn get(&self, node: Self::Reference) -> T {
        self.values[node.row * self.columns + node.col]
    }

    fn get_mut(&mut self, node: Self::Reference) -> &mut T {
        &mut self.values[node.row * self.columns + node.col]
    }
}

impl Display for GridMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.cells.chunks(self.columns.max(1)) {
            for cell in row {
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Parses a picture of the map, one line per row: `#` or `X` is a wall, `.` is road.
///
/// Surrounding whitespace on a line is indentation and blank lines are skipped, so the output of
/// [`Display`] parses back to the same map.
impl FromStr for GridMap {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut columns = None;
        let mut cells = Vec::new();
        let mut rows = 0;

        for (line_no, line) in s.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            let line = line.trim();
            let width = line.chars().count();
            match columns {
                None => columns = Some(width),
                Some(expected) if expected != width => {
                    return Err(GridError::RaggedRow {
                        row: line_no,
                        expected,
                        actual: width,
                    })
                }
                Some(_) => {}
            }
            for (col, ch) in line.chars().enumerate() {
                cells.push(match ch {
                    '#' | 'X' => Cell::Wall,
                    '.' => Cell::Road,
                    other => {
                        return Err(GridError::UnknownSymbol {
                            symbol: other,
                            row: line_no,
                            col,
                        })
                    }
                });
            }
            rows += 1;
        }

        GridMap::from_cells(rows, columns.unwrap_or(0), cells)
    }
}

impl MapTrait for GridMap {
    type Reference = Point;
    type Storage<T: Default + Copy + Clone + 'static> = CellStorage<T>;

    fn is_valid(&self, node: Self::Reference) -> bool {
        self.contains(node)
    }

    fn is_passable(&self, node: Self::Reference) -> bool {
        self.is_road(node)
    }

    fn neighbors_of(
        &self,
        node: Self::Reference,
    ) -> impl Iterator<Item = (Self::Reference, usize)> {
        let mut points = Vec::with_capacity(4);

        if self.is_road(node) {
            if node.row > 0 {
                points.push(Point {
                    row: node.row - 1,
                    col: node.col,
                });
            }
            if node.col > 0 {
                points.push(Point {
                    col: node.col - 1,
                    row: node.row,
                });
            }
            if node.row + 1 < self.rows {
                points.push(Point {
                    row: node.row + 1,
                    col: node.col,
                });
            }
            if node.col + 1 < self.columns {
                points.push(Point {
                    col: node.col + 1,
                    row: node.row,
                });
            }
        }

        // filter to only keep road cells, every step costs the same
        points
            .into_iter()
            .filter(|p| self.is_road(*p))
            .map(|p| (p, 1))
    }

    fn heuristic(&self, from: Self::Reference, to: Self::Reference) -> usize {
        from.manhattan(&to)
    }

    fn create_storage<T: Default + Copy + Clone + 'static>(&self) -> Self::Storage<T> {
        CellStorage {
            columns: self.columns,
            values: vec![Default::default(); self.rows * self.columns],
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::find::{find_path, PathFinder, PathFinderState, PathResult};
    use std::collections::VecDeque;

    fn create_basic_map() -> GridMap {
        "
        #######
        #.###.#
        #.###.#
        #.#...#
        #.#.###
        #......
        #######
        "
        .parse()
        .unwrap()
    }

    /// Breadth-first distance, used as ground truth for the A* results
    fn bfs_distance(map: &GridMap, start: Point, goal: Point) -> Option<usize> {
        if !map.is_road(start) || !map.is_road(goal) {
            return None;
        }
        let mut dist = vec![None; map.rows() * map.columns()];
        let mut queue = VecDeque::from([start]);
        dist[start.row * map.columns() + start.col] = Some(0);
        while let Some(p) = queue.pop_front() {
            let d = dist[p.row * map.columns() + p.col].unwrap();
            if p == goal {
                return Some(d);
            }
            for (n, _) in map.neighbors_of(p) {
                let slot = &mut dist[n.row * map.columns() + n.col];
                if slot.is_none() {
                    *slot = Some(d + 1);
                    queue.push_back(n);
                }
            }
        }
        None
    }

    fn assert_valid_path(map: &GridMap, start: Point, path: &[Point]) {
        let mut previous = start;
        for &p in path {
            assert!(map.is_road(p), "{} is not a road", p);
            assert_eq!(previous.manhattan(&p), 1, "{} -> {} is not a step", previous, p);
            previous = p;
        }
    }

    #[test]
    fn test_basic_route() {
        let map = create_basic_map();

        let finder = PathFinder::new(&map, Point { row: 1, col: 1 }, Point { row: 1, col: 5 });

        assert!(matches!(
            finder.finish(&map).0,
            PathFinderState::PathFound(PathResult { total_cost: 12, .. })
        ));
    }

    #[test]
    fn test_stepwise_matches_finish() {
        let map = create_basic_map();
        let start = Point { row: 1, col: 1 };
        let goal = Point { row: 1, col: 5 };

        let mut finder = PathFinder::new(&map, start, goal);
        let mut steps = 0;
        while !finder.step(&map).is_done() {
            steps += 1;
            assert!(steps < 100);
        }
        let (finished, visited) = PathFinder::new(&map, start, goal).finish(&map);
        assert_eq!(finder.state(), &finished);

        // walls are never expanded
        assert!(visited.get(Point { row: 0, col: 0 }).is_none());
        assert_eq!(visited.get(goal).map(|v| v.cost), Some(12));
    }

    #[test]
    fn test_basic_no_route() {
        let map = create_basic_map();

        let finder = PathFinder::new(&map, Point { row: 1, col: 1 }, Point { row: 0, col: 5 });
        // no route to target
        assert!(matches!(
            finder.finish(&map).0,
            PathFinderState::NoPathFound
        ));
    }

    #[test]
    fn test_path_excludes_start_and_ends_at_goal() {
        let map = create_basic_map();
        let start = Point { row: 1, col: 1 };
        let goal = Point { row: 1, col: 5 };

        let path = find_path(&map, start, goal);

        assert_eq!(path.len(), 12);
        assert_eq!(path.last(), Some(&goal));
        assert!(!path.contains(&start));
        assert_valid_path(&map, start, &path);
    }

    #[test]
    fn test_wall_endpoints_give_no_path() {
        let map = create_basic_map();
        let road = Point { row: 1, col: 1 };
        let wall = Point { row: 0, col: 0 };
        let outside = Point { row: 7, col: 1 };

        assert!(find_path(&map, wall, road).is_empty());
        assert!(find_path(&map, road, wall).is_empty());
        assert!(find_path(&map, road, outside).is_empty());
        assert!(find_path(&map, wall, wall).is_empty());
    }

    #[test]
    fn test_start_equals_goal() {
        let map = create_basic_map();
        let p = Point { row: 3, col: 3 };

        let (state, _) = PathFinder::new(&map, p, p).finish(&map);
        assert_eq!(
            state,
            PathFinderState::PathFound(PathResult {
                path: vec![],
                start: p,
                goal: p,
                total_cost: 0,
            })
        );
    }

    #[test]
    fn test_wall_in_open_field() {
        let map: GridMap = "
            .....
            .....
            ..#..
            .....
            .....
        "
        .parse()
        .unwrap();
        let start = Point { row: 0, col: 0 };
        let goal = Point { row: 0, col: 4 };

        let path = find_path(&map, start, goal);
        assert_eq!(path.len(), 4);
        assert!(!path.contains(&Point { row: 2, col: 2 }));
        assert_valid_path(&map, start, &path);

        // through the wall row: (2,0) -> (2,4) has to step around (2,2)
        let start = Point { row: 2, col: 0 };
        let goal = Point { row: 2, col: 4 };
        let path = find_path(&map, start, goal);
        assert_eq!(path.len(), 6);
        assert_valid_path(&map, start, &path);
    }

    #[test]
    fn test_matches_bfs_on_all_pairs() {
        let map: GridMap = "
            ..#.....
            ..#.##..
            ....#...
            ###.#.#.
            ....#.#.
            .##...#.
        "
        .parse()
        .unwrap();
        let roads: Vec<Point> = map.road_cells().collect();

        for &start in &roads {
            for &goal in &roads {
                let path = find_path(&map, start, goal);
                match bfs_distance(&map, start, goal) {
                    Some(distance) => {
                        assert_eq!(path.len(), distance, "{} -> {}", start, goal);
                        assert_valid_path(&map, start, &path);
                    }
                    None => assert!(path.is_empty(), "{} -> {}", start, goal),
                }
            }
        }
    }

    #[test]
    fn test_disconnected_regions() {
        let map: GridMap = "
            ..#..
            ..#..
            ..#..
        "
        .parse()
        .unwrap();
        assert!(find_path(&map, Point { row: 0, col: 0 }, Point { row: 2, col: 4 }).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let map: GridMap = "
            ......
            ......
            ......
            ......
        "
        .parse()
        .unwrap();
        let start = Point { row: 0, col: 0 };
        let goal = Point { row: 3, col: 5 };

        let first = find_path(&map, start, goal);
        for _ in 0..10 {
            assert_eq!(find_path(&map, start, goal), first);
        }
    }

    #[test]
    fn test_parse_and_display() {
        let map: GridMap = "#.\n.#\n".parse().unwrap();
        assert_eq!(map.rows(), 2);
        assert_eq!(map.columns(), 2);
        assert_eq!(map.get(Point { row: 0, col: 1 }), Some(Cell::Road));
        assert_eq!(map.get(Point { row: 2, col: 0 }), None);
        assert_eq!(map.to_string(), "#.\n.#\n");

        assert!(matches!(
            "##\n#".parse::<GridMap>(),
            Err(GridError::RaggedRow { row: 1, .. })
        ));
        assert!(matches!(
            "#?".parse::<GridMap>(),
            Err(GridError::UnknownSymbol { symbol: '?', .. })
        ));
    }

    #[test]
    fn test_display_parses_back() {
        for picture in ["#.\n.#", ".#.\n...\n#.#", "..\n..", "#"] {
            let map: GridMap = picture.parse().unwrap();
            assert_eq!(map.to_string().parse::<GridMap>(), Ok(map.clone()));
        }

        // roads on the edges of a row survive indentation
        let indented: GridMap = "
            .#.
            ...
        "
        .parse()
        .unwrap();
        assert_eq!(indented.columns(), 3);
        assert_eq!(indented.road_cells().count(), 5);
        assert_eq!(indented.to_string(), ".#.\n...\n");

        // a space is not a cell
        assert!(matches!(
            "# #".parse::<GridMap>(),
            Err(GridError::UnknownSymbol { symbol: ' ', col: 1, .. })
        ));
    }

    #[test]
    fn test_scale_up() {
        let mut map: GridMap = "#.\n..".parse().unwrap();
        map.scale_up(2);
        assert_eq!(map.rows(), 4);
        assert_eq!(map.columns(), 4);
        assert_eq!(map.get(Point { row: 1, col: 1 }), Some(Cell::Wall));
        assert_eq!(map.get(Point { row: 1, col: 2 }), Some(Cell::Road));
        assert_eq!(map.road_cells().count(), 12);
    }
}
