use crate::config::GridConfig;
use crate::model::{Agent, Cell, Population};
use anyhow::Result;
use rand::prelude::*;

/// Moore neighborhood offsets.
const OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Agents living on the cells of a bounded `width x height` grid.
///
/// Every cell is either occupied by exactly one agent or listed as vacant.
pub struct GridPopulation {
    width: usize,
    height: usize,
    agents: Vec<Agent<Cell>>,
    occupancy: Vec<Option<usize>>,
    vacant: Vec<Cell>,
}

impl GridPopulation {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn vacant(&self) -> &[Cell] {
        &self.vacant
    }

    /// Index of the agent living at `cell`, if any.
    pub fn occupant(&self, cell: Cell) -> Option<usize> {
        self.occupancy[self.cell_index(cell)]
    }

    fn cell_index(&self, cell: Cell) -> usize {
        cell.y * self.width + cell.x
    }
}

impl Population for GridPopulation {
    type Config = GridConfig;
    type Pos = Cell;

    fn generate<R: Rng>(cfg: &GridConfig, rng: &mut R) -> Result<Self> {
        let (width, height) = (cfg.width, cfg.height);
        let n_cells = width * height;

        let mut cells: Vec<_> = (0..width)
            .flat_map(|x| (0..height).map(move |y| Cell { x, y }))
            .collect();
        cells.shuffle(rng);

        // The first shuffled cells stay vacant, the rest are dealt out
        // to the groups in turn so group sizes differ by at most one.
        let n_empty = ((cfg.empty_ratio * n_cells as f64).round() as usize).min(n_cells);
        let vacant = cells[..n_empty].to_vec();
        let agents: Vec<_> = cells[n_empty..]
            .iter()
            .enumerate()
            .map(|(i_agt, &cell)| Agent::new(i_agt, i_agt % cfg.n_groups, cell))
            .collect();

        let mut pop = Self {
            width,
            height,
            agents,
            occupancy: vec![None; n_cells],
            vacant,
        };
        for i_agt in 0..pop.agents.len() {
            let i_cell = pop.cell_index(pop.agents[i_agt].pos);
            pop.occupancy[i_cell] = Some(i_agt);
        }

        Ok(pop)
    }

    fn agents(&self) -> &[Agent<Cell>] {
        &self.agents
    }

    fn neighbor_groups(&self, i_agt: usize) -> impl Iterator<Item = usize> + '_ {
        let Cell { x, y } = self.agents[i_agt].pos;
        OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let x = x.checked_add_signed(dx)?;
            let y = y.checked_add_signed(dy)?;
            if x >= self.width || y >= self.height {
                return None;
            }
            let i_nbr = self.occupancy[self.cell_index(Cell { x, y })]?;
            Some(self.agents[i_nbr].group())
        })
    }

    fn relocate<R: Rng>(&mut self, i_agt: usize, rng: &mut R) -> bool {
        if self.vacant.is_empty() {
            return false;
        }

        // The chosen vacant slot is overwritten by the cell being left.
        let i_vac = rng.random_range(0..self.vacant.len());
        let new_cell = self.vacant[i_vac];
        let old_cell = std::mem::replace(&mut self.agents[i_agt].pos, new_cell);
        self.vacant[i_vac] = old_cell;

        let i_old = self.cell_index(old_cell);
        let i_new = self.cell_index(new_cell);
        self.occupancy[i_old] = None;
        self.occupancy[i_new] = Some(i_agt);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;
    use std::collections::HashSet;

    fn cfg(width: usize, height: usize, empty_ratio: f64, n_groups: usize) -> GridConfig {
        GridConfig {
            width,
            height,
            empty_ratio,
            happiness_threshold: 0.5,
            n_groups,
            max_iter: 10,
        }
    }

    fn assert_consistent(pop: &GridPopulation) {
        let occupied: HashSet<_> = pop.agents().iter().map(|agt| *agt.pos()).collect();
        let vacant: HashSet<_> = pop.vacant().iter().copied().collect();
        assert_eq!(occupied.len(), pop.agents().len());
        assert_eq!(vacant.len(), pop.vacant().len());
        assert!(occupied.is_disjoint(&vacant));
        assert_eq!(occupied.len() + vacant.len(), pop.width() * pop.height());
        for (i_agt, agt) in pop.agents().iter().enumerate() {
            assert_eq!(pop.occupant(*agt.pos()), Some(i_agt));
        }
        for &cell in pop.vacant() {
            assert_eq!(pop.occupant(cell), None);
        }
    }

    #[test]
    fn generate_splits_cells_evenly() {
        let mut rng = ChaCha12Rng::seed_from_u64(42);
        let pop = GridPopulation::generate(&cfg(10, 7, 0.25, 3), &mut rng).unwrap();

        // round(0.25 * 70) = 18 vacant, 52 agents split 18/17/17.
        assert_eq!(pop.vacant().len(), 18);
        assert_eq!(pop.agents().len(), 52);
        assert_eq!(pop.group_sizes(3), vec![18, 17, 17]);
        assert_consistent(&pop);
    }

    #[test]
    fn generate_without_vacancies_fills_the_grid() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let pop = GridPopulation::generate(&cfg(4, 5, 0.0, 2), &mut rng).unwrap();
        assert!(pop.vacant().is_empty());
        assert_eq!(pop.agents().len(), 20);
        assert_consistent(&pop);
    }

    #[test]
    fn agent_ids_follow_visitation_order() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let pop = GridPopulation::generate(&cfg(6, 6, 0.1, 2), &mut rng).unwrap();
        for (i_agt, agt) in pop.agents().iter().enumerate() {
            assert_eq!(agt.id(), i_agt);
        }
    }

    #[test]
    fn corner_has_at_most_three_neighbors() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let pop = GridPopulation::generate(&cfg(5, 5, 0.0, 1), &mut rng).unwrap();
        for (i_agt, agt) in pop.agents().iter().enumerate() {
            let Cell { x, y } = *agt.pos();
            let on_x_edge = x == 0 || x == 4;
            let on_y_edge = y == 0 || y == 4;
            let expected = match (on_x_edge, on_y_edge) {
                (true, true) => 3,
                (true, false) | (false, true) => 5,
                (false, false) => 8,
            };
            assert_eq!(pop.neighbor_groups(i_agt).count(), expected, "agent at {x},{y}");
        }
    }

    #[test]
    fn vacant_cells_are_not_neighbors() {
        let mut rng = ChaCha12Rng::seed_from_u64(9);
        let pop = GridPopulation::generate(&cfg(8, 8, 0.3, 2), &mut rng).unwrap();
        for (i_agt, agt) in pop.agents().iter().enumerate() {
            let Cell { x, y } = *agt.pos();
            let mut expected = 0;
            for &(dx, dy) in &OFFSETS {
                let (nx, ny) = (x as isize + dx, y as isize + dy);
                if nx < 0 || ny < 0 || nx >= 8 || ny >= 8 {
                    continue;
                }
                let cell = Cell { x: nx as usize, y: ny as usize };
                if pop.occupant(cell).is_some() {
                    expected += 1;
                }
            }
            assert_eq!(pop.neighborhood(i_agt).n_neighbors(), expected);
        }
    }

    #[test]
    fn relocate_swaps_with_a_vacant_cell() {
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        let mut pop = GridPopulation::generate(&cfg(6, 4, 0.25, 2), &mut rng).unwrap();
        let vacant_before: HashSet<_> = pop.vacant().iter().copied().collect();
        let old_cell = *pop.agents()[0].pos();

        assert!(pop.relocate(0, &mut rng));

        let new_cell = *pop.agents()[0].pos();
        assert!(vacant_before.contains(&new_cell));
        assert!(pop.vacant().contains(&old_cell));
        assert!(!pop.vacant().contains(&new_cell));
        assert_consistent(&pop);
    }

    #[test]
    fn relocate_without_vacancies_is_a_no_op() {
        let mut rng = ChaCha12Rng::seed_from_u64(13);
        let mut pop = GridPopulation::generate(&cfg(3, 3, 0.0, 2), &mut rng).unwrap();
        let cells: Vec<_> = pop.agents().iter().map(|agt| *agt.pos()).collect();

        assert!(!pop.relocate(4, &mut rng));

        let cells_after: Vec<_> = pop.agents().iter().map(|agt| *agt.pos()).collect();
        assert_eq!(cells, cells_after);
        assert_consistent(&pop);
    }
}
