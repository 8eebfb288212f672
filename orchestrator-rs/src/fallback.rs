//! Fallback Diagnosis Module
//!
//! Deterministic, model-free diagnosis used when the agent pipeline fails.
//! A two-level rule table maps system and leading symptom to a diagnosis
//! template; bounded random perturbation keeps repeated outputs from being
//! byte-identical. Matching is case-insensitive and first-symptom-wins.

use rand::Rng;

use fleet_types_rs::{FinalDiagnosis, Severity};

/// Version label marking a diagnosis as synthetic.
pub const MOCK_MODEL_VERSION: &str = "mock-v1.0";

struct FallbackRule {
    componente: &'static str,
    probabilidade_falha: f64,
    horizonte_dias: i64,
    severidade: Severity,
    recomendacao: &'static str,
    pecas_sugeridas: &'static [&'static str],
    economia_estimada: f64,
    base_historica: &'static str,
}

struct SystemRules {
    sistema: &'static str,
    default: FallbackRule,
    por_sintoma: &'static [(&'static str, FallbackRule)],
}

static RULES: &[SystemRules] = &[
    SystemRules {
        sistema: "Motor",
        default: FallbackRule {
            componente: "Motor — diagnóstico geral",
            probabilidade_falha: 0.55,
            horizonte_dias: 15,
            severidade: Severity::Media,
            recomendacao: "Realizar diagnóstico completo do motor com scanner OBD. \
                           Verificar compressão dos cilindros e sistema de injeção.",
            pecas_sugeridas: &["Filtro combustível", "Velas de ignição", "Junta do coletor"],
            economia_estimada: 4500.00,
            base_historica: "Baseado em padrões gerais de falha de motor diesel pesado",
        },
        por_sintoma: &[
            (
                "falha de ignição",
                FallbackRule {
                    componente: "Bico injetor",
                    probabilidade_falha: 0.75,
                    horizonte_dias: 7,
                    severidade: Severity::Alta,
                    recomendacao: "Substituir bico injetor defeituoso. Verificar pressão do \
                                   rail e qualidade do combustível.",
                    pecas_sugeridas: &["Bico injetor", "Anel vedação", "Filtro combustível"],
                    economia_estimada: 6800.00,
                    base_historica: "Baseado em 312 casos de falha de ignição em motores diesel",
                },
            ),
            (
                "perda de potência",
                FallbackRule {
                    componente: "Turbocompressor",
                    probabilidade_falha: 0.68,
                    horizonte_dias: 10,
                    severidade: Severity::Alta,
                    recomendacao: "Inspecionar turbocompressor para folga axial e vazamentos. \
                                   Verificar intercooler e mangueiras de pressão.",
                    pecas_sugeridas: &["Kit reparo turbo", "Mangueira intercooler", "Junta turbo"],
                    economia_estimada: 9200.00,
                    base_historica: "Baseado em 245 casos de perda de potência relacionados a turbo",
                },
            ),
            (
                "fumaça escura",
                FallbackRule {
                    componente: "Sistema de injeção",
                    probabilidade_falha: 0.70,
                    horizonte_dias: 8,
                    severidade: Severity::Alta,
                    recomendacao: "Verificar bicos injetores e bomba de alta pressão. Fumaça \
                                   escura indica excesso de combustível ou injeção incorreta.",
                    pecas_sugeridas: &["Bico injetor", "Bomba alta pressão", "Filtro combustível"],
                    economia_estimada: 7500.00,
                    base_historica: "Baseado em 189 casos de fumaça escura em diesel pesado",
                },
            ),
        ],
    },
    SystemRules {
        sistema: "Freios",
        default: FallbackRule {
            componente: "Sistema de freios — diagnóstico geral",
            probabilidade_falha: 0.50,
            horizonte_dias: 12,
            severidade: Severity::Media,
            recomendacao: "Inspeção completa do sistema de freios: pastilhas, discos, \
                           flexíveis e cilindros.",
            pecas_sugeridas: &["Pastilhas", "Discos", "Flexíveis"],
            economia_estimada: 3500.00,
            base_historica: "Baseado em padrões gerais de desgaste de freios",
        },
        por_sintoma: &[
            (
                "ruído metálico",
                FallbackRule {
                    componente: "Pastilhas e discos de freio",
                    probabilidade_falha: 0.80,
                    horizonte_dias: 5,
                    severidade: Severity::Alta,
                    recomendacao: "Substituição imediata de pastilhas. Verificar discos para \
                                   desgaste abaixo do mínimo e empenamento.",
                    pecas_sugeridas: &[
                        "Kit pastilhas eixo dianteiro",
                        "Discos de freio",
                        "Sensor desgaste",
                    ],
                    economia_estimada: 4200.00,
                    base_historica: "Baseado em 523 casos de ruído metálico em freios de caminhão",
                },
            ),
            (
                "vibração ao frear",
                FallbackRule {
                    componente: "Discos de freio",
                    probabilidade_falha: 0.72,
                    horizonte_dias: 7,
                    severidade: Severity::Alta,
                    recomendacao: "Retificar ou substituir discos de freio. Empenamento causa \
                                   vibração e reduz eficiência de frenagem.",
                    pecas_sugeridas: &["Discos de freio", "Pastilhas", "Rolamento cubo"],
                    economia_estimada: 5100.00,
                    base_historica: "Baseado em 298 casos de vibração ao frear",
                },
            ),
            (
                "pedal longo",
                FallbackRule {
                    componente: "Cilindro mestre / servo-freio",
                    probabilidade_falha: 0.65,
                    horizonte_dias: 10,
                    severidade: Severity::Alta,
                    recomendacao: "Verificar nível de fluido, cilindro mestre e servo-freio. \
                                   Pedal longo pode indicar entrada de ar ou vazamento interno.",
                    pecas_sugeridas: &["Cilindro mestre", "Kit reparo servo", "Fluido de freio"],
                    economia_estimada: 3800.00,
                    base_historica: "Baseado em 167 casos de pedal longo em freios pneumáticos",
                },
            ),
        ],
    },
    SystemRules {
        sistema: "Arrefecimento",
        default: FallbackRule {
            componente: "Sistema de arrefecimento — diagnóstico geral",
            probabilidade_falha: 0.55,
            horizonte_dias: 12,
            severidade: Severity::Media,
            recomendacao: "Teste de pressão no sistema de arrefecimento. Verificar mangueiras, \
                           radiador e bomba d'água.",
            pecas_sugeridas: &["Mangueiras", "Abraçadeiras", "Líquido arrefecimento"],
            economia_estimada: 3000.00,
            base_historica: "Baseado em padrões gerais de falha de arrefecimento",
        },
        por_sintoma: &[
            (
                "temperatura elevada",
                FallbackRule {
                    componente: "Bomba d'água",
                    probabilidade_falha: 0.82,
                    horizonte_dias: 4,
                    severidade: Severity::Critica,
                    recomendacao: "Substituir bomba d'água urgentemente. Superaquecimento pode \
                                   causar dano irreversível ao cabeçote e bloco do motor.",
                    pecas_sugeridas: &[
                        "Bomba d'água",
                        "Junta do cabeçote",
                        "Termostato",
                        "Líquido arrefecimento",
                    ],
                    economia_estimada: 12500.00,
                    base_historica: "Baseado em 847 casos de superaquecimento em motores diesel pesado",
                },
            ),
            (
                "perda de líquido",
                FallbackRule {
                    componente: "Radiador / mangueiras",
                    probabilidade_falha: 0.70,
                    horizonte_dias: 6,
                    severidade: Severity::Alta,
                    recomendacao: "Localizar ponto de vazamento com teste de pressão. Verificar \
                                   radiador, mangueiras e conexões.",
                    pecas_sugeridas: &["Radiador", "Kit mangueiras", "Abraçadeiras"],
                    economia_estimada: 5500.00,
                    base_historica: "Baseado em 412 casos de vazamento de líquido de arrefecimento",
                },
            ),
        ],
    },
    SystemRules {
        sistema: "Transmissão",
        default: FallbackRule {
            componente: "Transmissão — diagnóstico geral",
            probabilidade_falha: 0.50,
            horizonte_dias: 20,
            severidade: Severity::Media,
            recomendacao: "Verificar nível e qualidade do óleo de câmbio. Testar \
                           sincronizadores e engrenagens.",
            pecas_sugeridas: &["Óleo câmbio", "Filtro câmbio", "Junta do cárter"],
            economia_estimada: 5000.00,
            base_historica: "Baseado em padrões gerais de falha de transmissão",
        },
        por_sintoma: &[
            (
                "dificuldade de engate",
                FallbackRule {
                    componente: "Sincronizadores",
                    probabilidade_falha: 0.72,
                    horizonte_dias: 12,
                    severidade: Severity::Alta,
                    recomendacao: "Verificar sincronizadores e garfos de engate. Pode ser \
                                   necessário revisão do câmbio.",
                    pecas_sugeridas: &["Kit sincronizadores", "Garfo de engate", "Óleo câmbio"],
                    economia_estimada: 11000.00,
                    base_historica: "Baseado em 156 casos de dificuldade de engate",
                },
            ),
            (
                "patinação",
                FallbackRule {
                    componente: "Embreagem",
                    probabilidade_falha: 0.85,
                    horizonte_dias: 5,
                    severidade: Severity::Alta,
                    recomendacao: "Substituir kit embreagem completo. Patinação indica disco \
                                   desgastado além do limite.",
                    pecas_sugeridas: &[
                        "Kit embreagem completo",
                        "Rolamento atuador",
                        "Volante motor",
                    ],
                    economia_estimada: 8500.00,
                    base_historica: "Baseado em 389 casos de patinação de embreagem",
                },
            ),
        ],
    },
    SystemRules {
        sistema: "Suspensão",
        default: FallbackRule {
            componente: "Suspensão — diagnóstico geral",
            probabilidade_falha: 0.45,
            horizonte_dias: 18,
            severidade: Severity::Media,
            recomendacao: "Inspeção visual completa da suspensão. Verificar bolsas de ar, \
                           amortecedores e buchas.",
            pecas_sugeridas: &["Buchas", "Amortecedores", "Pinos e graxeiras"],
            economia_estimada: 3200.00,
            base_historica: "Baseado em padrões gerais de desgaste de suspensão",
        },
        por_sintoma: &[
            (
                "vibração",
                FallbackRule {
                    componente: "Amortecedores / bolsas de ar",
                    probabilidade_falha: 0.65,
                    horizonte_dias: 10,
                    severidade: Severity::Media,
                    recomendacao: "Verificar amortecedores e bolsas de ar pneumática. Vibração \
                                   pode causar fadiga prematura em outros componentes.",
                    pecas_sugeridas: &["Amortecedores", "Bolsas de ar", "Buchas estabilizador"],
                    economia_estimada: 4800.00,
                    base_historica: "Baseado em 278 casos de vibração em suspensão pneumática",
                },
            ),
            (
                "desgaste irregular pneus",
                FallbackRule {
                    componente: "Geometria / terminais de direção",
                    probabilidade_falha: 0.60,
                    horizonte_dias: 14,
                    severidade: Severity::Media,
                    recomendacao: "Realizar alinhamento e verificar terminais de direção, \
                                   pivôs e braço pitman.",
                    pecas_sugeridas: &["Terminais de direção", "Pivô", "Alinhamento"],
                    economia_estimada: 2800.00,
                    base_historica: "Baseado em 345 casos de desgaste irregular de pneus",
                },
            ),
        ],
    },
];

/// Diagnosis values selected from the table before perturbation.
struct ChosenDiagnosis {
    componente: String,
    probabilidade_falha: f64,
    horizonte_dias: i64,
    severidade: Severity,
    recomendacao: String,
    pecas_sugeridas: Vec<String>,
    economia_estimada: f64,
    base_historica: String,
}

impl From<&FallbackRule> for ChosenDiagnosis {
    fn from(rule: &FallbackRule) -> Self {
        Self {
            componente: rule.componente.to_string(),
            probabilidade_falha: rule.probabilidade_falha,
            horizonte_dias: rule.horizonte_dias,
            severidade: rule.severidade,
            recomendacao: rule.recomendacao.to_string(),
            pecas_sugeridas: rule.pecas_sugeridas.iter().map(|p| p.to_string()).collect(),
            economia_estimada: rule.economia_estimada,
            base_historica: rule.base_historica.to_string(),
        }
    }
}

/// Template for a system the table does not know.
fn unmapped_system(sistema: &str) -> ChosenDiagnosis {
    ChosenDiagnosis {
        componente: format!("{} — componente não mapeado", sistema),
        probabilidade_falha: 0.50,
        horizonte_dias: 15,
        severidade: Severity::Media,
        recomendacao: format!(
            "Realizar inspeção completa do sistema de {}.",
            sistema.to_lowercase()
        ),
        pecas_sugeridas: Vec::new(),
        economia_estimada: 3000.00,
        base_historica: "Sem base histórica suficiente para este caso".to_string(),
    }
}

fn select_rule(sistema: &str, sintomas: &[String]) -> ChosenDiagnosis {
    let wanted_system = sistema.to_lowercase();
    let system_rules = RULES
        .iter()
        .find(|rules| rules.sistema.to_lowercase() == wanted_system);

    let system_rules = match system_rules {
        Some(rules) => rules,
        None => return unmapped_system(sistema),
    };

    // First reported symptom with a table entry wins.
    for sintoma in sintomas {
        let wanted = sintoma.to_lowercase();
        if let Some((_, rule)) = system_rules
            .por_sintoma
            .iter()
            .find(|(nome, _)| nome.to_lowercase() == wanted)
        {
            return rule.into();
        }
    }

    (&system_rules.default).into()
}

/// Generate a synthetic diagnosis from the rule table.
///
/// Always succeeds: unknown systems get a generic inspection template.
pub fn generate_fallback_diagnostic(
    sistema: &str,
    sintomas: &[String],
    veiculo_km: f64,
) -> FinalDiagnosis {
    let mut rng = rand::thread_rng();
    generate_with_rng(sistema, sintomas, veiculo_km, &mut rng)
}

/// Table lookup plus perturbation with a caller-supplied source of
/// randomness.
pub fn generate_with_rng<R: Rng>(
    sistema: &str,
    sintomas: &[String],
    veiculo_km: f64,
    rng: &mut R,
) -> FinalDiagnosis {
    let chosen = select_rule(sistema, sintomas);

    // Bounded noise simulating model uncertainty.
    let prob = chosen.probabilidade_falha + rng.gen_range(-0.05..=0.05);
    let prob = prob.clamp(0.10, 0.99);
    let prob = (prob * 100.0).round() / 100.0;

    let horizonte = (chosen.horizonte_dias + rng.gen_range(-2..=2)).max(1);

    // High-mileage vehicles get one severity step up, never down.
    let mut severidade = chosen.severidade;
    if veiculo_km > 300_000.0 && severidade == Severity::Media {
        severidade = Severity::Alta;
    }

    FinalDiagnosis {
        componente: chosen.componente,
        probabilidade_falha: prob,
        horizonte_dias: horizonte,
        severidade,
        sintomas_correlacionados: sintomas.to_vec(),
        recomendacao: chosen.recomendacao,
        pecas_sugeridas: chosen.pecas_sugeridas,
        economia_estimada: chosen.economia_estimada,
        base_historica: chosen.base_historica,
        modelo_versao: Some(MOCK_MODEL_VERSION.to_string()),
    }
}
