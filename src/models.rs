#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub planned_budget: f64,
    pub archived: bool,
    pub ledger_tag: Option<String>,
}

impl Project {
    /// The tag this project's ledger splits carry. Defaults to the name.
    pub fn tag(&self) -> &str {
        self.ledger_tag.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct SavingGoal {
    pub id: i64,
    pub project_id: i64,
    pub monthly_amount: f64,
    pub start_date: String,
    pub end_date: Option<String>,
    pub reason: Option<String>,
}
