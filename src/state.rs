use crate::models::{FilterSpec, SortKey};

/// Everything the dashboard view needs besides the data itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardState {
    pub filters: FilterSpec,
    pub only_matches: bool,
    pub selected: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetKeyword(String),
    SetLocation(String),
    SetMode(String),
    SetExperience(String),
    SetSource(String),
    SetStatus(String),
    SetSort(SortKey),
    CycleSort,
    ToggleOnlyMatches,
    /// Resets the filters; the match toggle and selection are kept.
    ClearFilters,
    Select(Option<i64>),
}

pub fn reduce(state: DashboardState, action: Action) -> DashboardState {
    let mut next = state;
    match action {
        Action::SetKeyword(v) => next.filters.keyword = v,
        Action::SetLocation(v) => next.filters.location = v,
        Action::SetMode(v) => next.filters.mode = v,
        Action::SetExperience(v) => next.filters.experience = v,
        Action::SetSource(v) => next.filters.source = v,
        Action::SetStatus(v) => next.filters.status = v,
        Action::SetSort(sort) => next.filters.sort = sort,
        Action::CycleSort => next.filters.sort = next.filters.sort.next(),
        Action::ToggleOnlyMatches => next.only_matches = !next.only_matches,
        Action::ClearFilters => next.filters = FilterSpec::default(),
        Action::Select(id) => next.selected = id,
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = DashboardState::default();
        assert_eq!(state.filters.sort, SortKey::Latest);
        assert!(!state.only_matches);
        assert!(state.selected.is_none());
    }

    #[test]
    fn test_set_filters() {
        let state = reduce(DashboardState::default(), Action::SetLocation("Pune".to_string()));
        let state = reduce(state, Action::SetMode("Remote".to_string()));
        let state = reduce(state, Action::SetSort(SortKey::Salary));
        assert_eq!(state.filters.location, "Pune");
        assert_eq!(state.filters.mode, "Remote");
        assert_eq!(state.filters.sort, SortKey::Salary);
    }

    #[test]
    fn test_cycle_sort_visits_every_key() {
        let mut state = DashboardState::default();
        let mut seen = vec![state.filters.sort];
        for _ in 0..3 {
            state = reduce(state, Action::CycleSort);
            seen.push(state.filters.sort);
        }
        assert_eq!(seen, vec![SortKey::Latest, SortKey::Match, SortKey::Salary, SortKey::Oldest]);
        assert_eq!(reduce(state, Action::CycleSort).filters.sort, SortKey::Latest);
    }

    #[test]
    fn test_clear_filters_keeps_toggle_and_selection() {
        let state = DashboardState::default();
        let state = reduce(state, Action::SetKeyword("react".to_string()));
        let state = reduce(state, Action::SetStatus("Applied".to_string()));
        let state = reduce(state, Action::ToggleOnlyMatches);
        let state = reduce(state, Action::Select(Some(7)));

        let cleared = reduce(state.clone(), Action::ClearFilters);
        assert_eq!(cleared.filters, FilterSpec::default());
        assert!(cleared.only_matches);
        assert_eq!(cleared.selected, Some(7));
        // the previous value is untouched
        assert_eq!(state.filters.keyword, "react");
    }
}
