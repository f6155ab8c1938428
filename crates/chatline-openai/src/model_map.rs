use chatline_core::model::{Effort, Model, OpenAiModel};

/// How the effort level is expressed on the wire for a given model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Tuning {
    Reasoning(Effort),
    Sampling { temperature: f64, top_p: f64 },
}

pub(crate) fn map_model(model: &Model, effort: Effort) -> (String, Tuning) {
    let tuning = if supports_reasoning_effort(model) {
        Tuning::Reasoning(effort)
    } else {
        sampling_for(effort)
    };

    (model.id().to_owned(), tuning)
}

fn supports_reasoning_effort(model: &Model) -> bool {
    match model {
        Model::OpenAi(OpenAiModel::Gpt5 | OpenAiModel::Gpt5Mini) => true,
        Model::OpenAi(OpenAiModel::Gpt4Turbo | OpenAiModel::Gpt4 | OpenAiModel::Gpt35Turbo) => false,
        Model::Custom(id) => ["gpt-5", "o1", "o3", "o4"]
            .iter()
            .any(|prefix| id.starts_with(prefix)),
    }
}

fn sampling_for(effort: Effort) -> Tuning {
    let (temperature, top_p) = match effort {
        Effort::Low => (0.3, 0.5),
        Effort::Medium => (0.7, 0.8),
        Effort::High => (1.0, 1.0),
    };
    Tuning::Sampling { temperature, top_p }
}
