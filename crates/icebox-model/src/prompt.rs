//! Deterministic prompt assembly
//!
//! Two fixed text blocks - a persona/system instruction and a task
//! instruction carrying the output schema contract - plus dynamic
//! augmentation appended only when data is present. The schema contract
//! is restated verbatim on every call: recovery has no negotiation
//! channel, it can only parse what arrives.
//!
//! Prompt content is pt-BR by product requirement; the model is told to
//! never answer in English.

use icebox_core::{Scalar, TrafficContext};
use std::fmt::Write as _;

/// Fixed persona and language requirement (system block)
pub const SYSTEM_INSTRUCTION: &str = "Você é um Gestor de Tráfego Sênior e Estrategista de Growth com 10 anos de experiência em contas de 7 dígitos no Meta Ads, Google Ads e TikTok Ads. Sua missão é analisar um diagnóstico de tráfego e gerar 5 experimentos de alta probabilidade de sucesso para otimizar o ROAS e baixar o CPA. Responda OBRIGATORIAMENTE em Português do Brasil (pt-BR). Nunca responda em inglês, nem misture idiomas.";

/// Fixed methodology rules and output schema contract (task block)
pub const TASK_RULES: &str = r#"Diretrizes de Especialista:

0) Antes de sugerir qualquer coisa, analise o objetivo (goal) e a métrica alvo informada pelo usuário. Entenda claramente o que significa "sucesso" para esse objetivo e qual métrica deve ser otimizada.
1) Foco em Funil: identifique se o problema está no TOFU (Atração/CTR), MOFU (Engajamento/Retenção) ou BOFU (Conversão/Checkout).
2) Linha de Corte (Cutoff): cada experimento deve ter uma linha de corte financeira clara, por exemplo: "Pausar se o CPL ultrapassar R$ X após 500 impressões".
3) Hipóteses Atômicas: nunca sugira apenas "melhorar o criativo". Em vez disso, sugira hipóteses concretas como "Testar um gancho de curiosidade nos primeiros 3 segundos vs um gancho de dor direta".
4) Priorização ICE:
   - Impacto: o quanto isso move o ponteiro do lucro?
   - Confiança: você já viu isso funcionar antes?
   - Facilidade: dá para subir esse teste em 15 minutos?

Comportamento para Objetivos de Tráfego:
- Se o objetivo estiver relacionado a tráfego, mídia paga, campanhas, anúncios ou criativos, deduza você mesmo as métricas relevantes (CPA, CTR, ROAS, CPC, taxa de retenção de vídeo) a partir do contexto e do objetivo, mesmo que o usuário não tenha fornecido números exatos.
- Inclua essas métricas de forma explícita em "metric", em "target" (valor numérico desejado) e no texto da "hypothesis" (ex.: "Elevar o CTR de 1,2% para 2,0%" ou "Reduzir o CPA de R$ 40 para R$ 25").
- Utilize as métricas fornecidas no diagnóstico mais recente (CPA, CTR, etc.) como base quantitativa para definir o "target" e a "cutoff_line" de cada hipótese gerada.

Regras de Linguagem:
- Responda sempre em Português do Brasil (pt-BR).
- Sempre use termos técnicos de tráfego em português do Brasil (ex.: CPA, CTR, criativos, funil, campanhas, conjuntos de anúncios, segmentação).
- Nos campos "title" e "hypothesis", escreva em português e use esse vocabulário técnico de mídia paga.

Formato de Saída (OBRIGATÓRIO):
- Sua resposta deve ser ÚNICA e EXCLUSIVAMENTE um objeto JSON válido. Proibido qualquer texto, explicação ou caractere antes do primeiro { ou depois do último }.
- A estrutura é exatamente: {"strategic_vision": "...", "experiments": [...]}
- "strategic_vision": string em português com a visão estratégica.
- "experiments": array com exatamente 5 objetos. Cada objeto com as chaves: "title", "hypothesis", "metric", "target", "cutoff_line", "ice_score".
- "target": número (integer ou float).
- "ice_score": OBRIGATORIAMENTE número inteiro (ex.: 7 ou 8). Nunca use string ou texto; o sistema rejeita e a inserção no banco falha.
- Não inclua markdown, blocos de código (```) nem comentários. Apenas o JSON puro."#;

/// Dynamic context feeding prompt augmentation.
///
/// Empty strings mean "absent": the corresponding sentence is simply not
/// appended, and absence of any one field never alters the rest of the
/// prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptInputs {
    pub goal_title: String,
    pub goal_metric: String,
    pub goal_platform: String,
    pub traffic: Option<TrafficContext>,
}

/// Assembled prompt ready for the generation client
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrompt {
    /// Persona block
    pub persona: &'static str,
    /// Task rules + schema contract + dynamic augmentation
    pub task: String,
}

impl AssembledPrompt {
    /// Persona and task concatenated into the single system turn
    #[must_use]
    pub fn system_content(&self) -> String {
        format!("{}\n\n{}", self.persona, self.task)
    }
}

/// Build the prompt deterministically from the supplied inputs
#[must_use]
pub fn assemble(inputs: &PromptInputs) -> AssembledPrompt {
    let mut task = TASK_RULES.to_string();

    if !inputs.goal_title.is_empty() {
        let _ = write!(task, "\n\nA meta em foco é: \"{}\".", inputs.goal_title);
    }
    if !inputs.goal_metric.is_empty() {
        let _ = write!(
            task,
            "\nA métrica alvo principal é: {}. Use essa métrica para orientar as hipóteses e os targets numéricos.",
            inputs.goal_metric
        );
    }
    if !inputs.goal_platform.is_empty() {
        let _ = write!(
            task,
            "\nA plataforma de tráfego pago em foco é: {}. Adapte os experimentos especificamente para essa plataforma.",
            inputs.goal_platform
        );
    }

    if let Some(traffic) = &inputs.traffic {
        let lines = quantitative_lines(traffic);
        if !lines.is_empty() {
            let _ = write!(
                task,
                "\n\nDados quantitativos do diagnóstico mais recente:\n{}",
                lines.join("\n")
            );
        }
    }

    AssembledPrompt {
        persona: SYSTEM_INSTRUCTION,
        task,
    }
}

/// One line per present metric, in fixed order
fn quantitative_lines(traffic: &TrafficContext) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(platform) = &traffic.platform {
        lines.push(format!("Plataforma principal (diagnóstico): {platform}"));
    }
    if let Some(cpa) = &traffic.cpa_current {
        lines.push(format!("CPA atual (diagnóstico): R$ {}", render(cpa)));
    }
    if let Some(cpa) = &traffic.cpa_target {
        lines.push(format!("CPA desejado (diagnóstico): R$ {}", render(cpa)));
    }
    if let Some(ctr) = &traffic.ctr_current {
        lines.push(format!("CTR atual (diagnóstico): {}%", render(ctr)));
    }
    if let Some(budget) = &traffic.daily_test_budget {
        lines.push(format!(
            "Orçamento diário de teste (diagnóstico): R$ {}",
            render(budget)
        ));
    }
    lines
}

fn render(value: &Scalar) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use icebox_core::Scalar;
    use pretty_assertions::assert_eq;

    #[test]
    fn assemble_without_context_is_just_rules() {
        let prompt = assemble(&PromptInputs::default());
        assert_eq!(prompt.task, TASK_RULES);
        assert_eq!(prompt.persona, SYSTEM_INSTRUCTION);
    }

    #[test]
    fn assemble_is_deterministic() {
        let inputs = PromptInputs {
            goal_title: "Dobrar o ROAS".to_string(),
            goal_metric: "CPA".to_string(),
            goal_platform: "Meta Ads".to_string(),
            traffic: None,
        };
        assert_eq!(assemble(&inputs), assemble(&inputs));
    }

    #[test]
    fn goal_sentences_appended_when_present() {
        let inputs = PromptInputs {
            goal_title: "Dobrar o ROAS".to_string(),
            goal_metric: "CPA".to_string(),
            goal_platform: "Meta Ads".to_string(),
            traffic: None,
        };
        let prompt = assemble(&inputs);
        assert!(prompt.task.contains("A meta em foco é: \"Dobrar o ROAS\"."));
        assert!(prompt.task.contains("A métrica alvo principal é: CPA."));
        assert!(prompt.task.contains("Meta Ads. Adapte os experimentos"));
    }

    #[test]
    fn absent_field_does_not_alter_the_rest() {
        let with_metric = PromptInputs {
            goal_title: "Meta".to_string(),
            goal_metric: "CTR".to_string(),
            ..Default::default()
        };
        let without_metric = PromptInputs {
            goal_title: "Meta".to_string(),
            ..Default::default()
        };

        let a = assemble(&with_metric).task;
        let b = assemble(&without_metric).task;
        // the title sentence is byte-identical in both prompts
        assert!(a.contains("A meta em foco é: \"Meta\"."));
        assert!(b.contains("A meta em foco é: \"Meta\"."));
        assert!(!b.contains("métrica alvo principal"));
    }

    #[test]
    fn quantitative_block_lists_only_present_metrics() {
        let inputs = PromptInputs {
            traffic: Some(TrafficContext {
                platform: Some("Meta Ads".to_string()),
                cpa_current: Some(Scalar::Number(40.0)),
                ctr_current: Some(Scalar::Text("1,2".to_string())),
                ..Default::default()
            }),
            ..Default::default()
        };
        let task = assemble(&inputs).task;
        assert!(task.contains("Dados quantitativos do diagnóstico mais recente:"));
        assert!(task.contains("Plataforma principal (diagnóstico): Meta Ads"));
        assert!(task.contains("CPA atual (diagnóstico): R$ 40"));
        assert!(task.contains("CTR atual (diagnóstico): 1,2%"));
        assert!(!task.contains("CPA desejado"));
        assert!(!task.contains("Orçamento diário"));
    }

    #[test]
    fn empty_traffic_block_is_omitted_entirely() {
        let inputs = PromptInputs {
            traffic: Some(TrafficContext::default()),
            ..Default::default()
        };
        let task = assemble(&inputs).task;
        assert!(!task.contains("Dados quantitativos"));
        assert_eq!(task, TASK_RULES);
    }

    #[test]
    fn schema_contract_present_in_every_prompt() {
        let prompt = assemble(&PromptInputs::default());
        let system = prompt.system_content();
        assert!(system.contains(r#"{"strategic_vision": "...", "experiments": [...]}"#));
        assert!(system.contains("exatamente 5 objetos"));
        assert!(system.starts_with(SYSTEM_INSTRUCTION));
    }
}
