//! Prompt builders: pure functions mapping command arguments to a
//! [`PromptPair`]. Nothing here touches the network.

use crate::model::types::PromptPair;

pub const RECIPE_ROLE: &str = "You are a Nigerian chef providing traditional recipes.";
pub const MEAL_PLAN_ROLE: &str = "You are a meal planner specializing in Nigerian cuisine.";
pub const ASK_ROLE: &str = "You are a Nigerian chef answering cooking questions.";
pub const NUTRITION_ROLE: &str = "You are a Nigerian nutrition expert.";

/// Minimum positional arguments for `/mealplan`.
pub const MEAL_PLAN_MIN_ARGS: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("expected at least {expected} arguments, got {got}")]
    NotEnoughArguments { expected: usize, got: usize },

    #[error("{field} must be a whole number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

pub fn recipe(meal_name: &str) -> PromptPair {
    PromptPair::new(
        RECIPE_ROLE,
        format!(
            "Provide an authentic Nigerian recipe for {meal_name}, including ingredients and step-by-step instructions."
        ),
    )
}

pub fn ask(question: &str) -> PromptPair {
    PromptPair::new(ASK_ROLE, question)
}

pub fn nutritional_value(meal_name: &str) -> PromptPair {
    PromptPair::new(
        NUTRITION_ROLE,
        format!(
            "Provide the nutritional value of {meal_name}, including calories, protein, fat, and relevant nutrients."
        ),
    )
}

pub fn meal_plan(req: &MealPlanRequest) -> PromptPair {
    let allergies = if req.allergies.is_empty() {
        "none".to_string()
    } else {
        req.allergies.join(", ")
    };

    let mut prompt = format!(
        "Create a {}-day meal plan with {} calories per day for someone in {}. \
Avoid foods containing {allergies}. Include traditional Nigerian dishes.",
        req.days, req.calories, req.region
    );
    if let Some(priority) = &req.priority {
        prompt.push_str(&format!(" Prioritize meals rich in {priority}."));
    }
    // A zero budget means "no ceiling".
    if let Some(budget) = req.budget.filter(|b| *b > 0) {
        prompt.push_str(&format!(" Keep the budget under {budget} Naira."));
    }

    PromptPair::new(MEAL_PLAN_ROLE, prompt)
}

/// Arguments of a `/mealplan` invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MealPlanRequest {
    pub region: String,
    pub calories: u32,
    pub allergies: Vec<String>,
    pub days: u32,
    pub priority: Option<String>,
    /// Ceiling in Naira.
    pub budget: Option<u64>,
}

impl MealPlanRequest {
    /// Parse `region calories allergies days [priority] [budget]`.
    ///
    /// Arguments past the sixth are ignored.
    pub fn from_args(args: &[String]) -> Result<Self, PromptError> {
        if args.len() < MEAL_PLAN_MIN_ARGS {
            return Err(PromptError::NotEnoughArguments {
                expected: MEAL_PLAN_MIN_ARGS,
                got: args.len(),
            });
        }

        let region = args[0].clone();
        let calories = parse_number("calories", &args[1])?;
        let allergies = parse_allergies(&args[2]);
        let days = parse_number("days", &args[3])?;
        let priority = args.get(4).cloned();
        let budget = args
            .get(5)
            .map(|raw| parse_number("budget", raw))
            .transpose()?;

        Ok(Self {
            region,
            calories,
            allergies,
            days,
            priority,
            budget,
        })
    }
}

/// Split a comma-separated allergy list. The literal `none` (any case) means no allergies.
pub fn parse_allergies(raw: &str) -> Vec<String> {
    if raw.trim().eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    let out: Vec<String> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();
    if out.is_empty() {
        // Degenerate input like ",": keep the raw token so the set is never empty.
        vec![raw.to_string()]
    } else {
        out
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, PromptError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| PromptError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}
