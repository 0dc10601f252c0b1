/// One finished measurement session.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRecord {
    pub rank: usize,
    pub player_name: String,
    pub team: String,
    pub max_speed_kmh: f64,
}

/// Results ordered by descending max speed, ranked 1..N.
///
/// Sorting is stable, so on equal speeds the earlier record keeps the better
/// rank.
#[derive(Debug, Default)]
pub struct ResultTable {
    records: Vec<ResultRecord>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record and returns its rank.
    pub fn insert(&mut self, player_name: String, team: String, max_speed_kmh: f64) -> usize {
        let index = self
            .records
            .partition_point(|r| r.max_speed_kmh.total_cmp(&max_speed_kmh).is_ge());
        self.records.insert(
            index,
            ResultRecord {
                rank: 0,
                player_name,
                team,
                max_speed_kmh,
            },
        );
        self.rerank();
        index + 1
    }

    pub fn remove(&mut self, index: usize) -> Option<ResultRecord> {
        if index >= self.records.len() {
            return None;
        }
        let removed = self.records.remove(index);
        self.rerank();
        Some(removed)
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn rerank(&mut self) {
        for (i, record) in self.records.iter_mut().enumerate() {
            record.rank = i + 1;
        }
    }
}
