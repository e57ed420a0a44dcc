use crate::backend::Usage;

const ONE_MILLION: f64 = 1_000_000.0;

/// Dollars per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub model: &'static str,
    pub input_per_million: f64,
    pub output_per_million: f64,
}

const PRICING: &[Pricing] = &[
    Pricing {
        model: "gpt-4o",
        input_per_million: 5.0,
        output_per_million: 15.0,
    },
    Pricing {
        model: "gpt-4o-2024-05-13",
        input_per_million: 5.0,
        output_per_million: 15.0,
    },
    Pricing {
        model: "gpt-4o-mini",
        input_per_million: 0.15,
        output_per_million: 0.6,
    },
    Pricing {
        model: "gpt-3.5-turbo-0125",
        input_per_million: 0.5,
        output_per_million: 1.5,
    },
    Pricing {
        model: "gpt-3.5-turbo-instruct",
        input_per_million: 1.5,
        output_per_million: 2.0,
    },
];

pub fn pricing_for(model: &str) -> Option<&'static Pricing> {
    PRICING.iter().find(|p| p.model == model)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub model: String,
    pub usage: Usage,
}

impl UsageRecord {
    pub fn new(model: &str, usage: Usage) -> Self {
        Self {
            model: model.to_string(),
            usage,
        }
    }

    /// `None` when the model has no pricing entry.
    pub fn cost(&self) -> Option<f64> {
        let pricing = pricing_for(&self.model)?;
        let input = pricing.input_per_million * self.usage.prompt_tokens as f64 / ONE_MILLION;
        let output =
            pricing.output_per_million * self.usage.completion_tokens as f64 / ONE_MILLION;
        Some(input + output)
    }
}

#[derive(Debug, Default)]
pub struct CostAggregator {
    records: Vec<UsageRecord>,
}

impl CostAggregator {
    pub fn record(&mut self, record: UsageRecord) {
        self.records.push(record);
    }

    pub fn totals(&self) -> Usage {
        let mut total = Usage::default();
        for record in &self.records {
            total += record.usage;
        }
        total
    }

    /// Sum over all items, or `None` as soon as one model is unpriced.
    pub fn total_cost(&self) -> Option<f64> {
        self.records
            .iter()
            .try_fold(0.0, |total, record| Some(total + record.cost()?))
    }

    pub fn summary_line(&self) -> String {
        match self.total_cost() {
            Some(cost) => format!("Total cost: ${cost}"),
            None => "Total cost: unknown".to_string(),
        }
    }
}
