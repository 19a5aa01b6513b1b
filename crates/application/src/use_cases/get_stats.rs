use std::sync::Arc;

use crate::core::{ClientHistory, Core, HistorySlot, StatsSummary};

pub struct GetStatsUseCase {
    core: Arc<Core>,
}

impl GetStatsUseCase {
    pub fn new(core: Arc<Core>) -> Self {
        Self { core }
    }

    pub fn execute(&self) -> StatsSummary {
        self.core.stats_summary()
    }
}

pub struct GetHistoryUseCase {
    core: Arc<Core>,
}

impl GetHistoryUseCase {
    pub fn new(core: Arc<Core>) -> Self {
        Self { core }
    }

    pub fn execute(&self) -> Vec<HistorySlot> {
        self.core.history()
    }

    pub fn execute_clients(&self, top: usize) -> ClientHistory {
        self.core.client_history(top)
    }
}
