//! Category taxonomy and payment-method vocabulary.
//!
//! These lists are advisory context for the model: they are composed into the
//! instruction context once and never used to reject a record. A reply with an
//! out-of-set category is still a valid draft.

use serde::{Deserialize, Serialize};

/// Default ordered category labels.
pub const CATEGORIES: &[&str] = &[
    "Aluguel",
    "Água",
    "Luz",
    "Academia",
    "Internet",
    "Plano de Saúde",
    "Telefone",
    "Prestação do Carro",
    "Prestação Moto",
    "Família e Filhos",
    "Pets",
    "Mercado",
    "Compras",
    "Alimentação",
    "Bares e Restaurantes",
    "Saúde",
    "Trabalho",
    "Dívidas e Empréstimos",
    "Assinaturas e Serviços",
    "Investimentos",
    "Casa",
    "Viagem",
    "Educação",
    "Impostos e Taxas",
    "Lazer e Hobbies",
    "Cuidados Pessoais",
    "Dízimo e Oferta",
    "Outros",
    "Roupas",
    "Transporte",
    "Presentes e Doações",
    "Salário",
    "Refeição",
    "Moradia",
    "Outras Receitas",
];

/// Categories that name a fixed monthly obligation (rent, utilities,
/// subscriptions, instalment plans).
pub const FIXED_OBLIGATIONS: &[&str] = &[
    "Aluguel",
    "Água",
    "Luz",
    "Academia",
    "Internet",
    "Plano de Saúde",
    "Telefone",
    "Prestação do Carro",
    "Prestação Moto",
    "Assinaturas e Serviços",
];

/// Payment methods the app knows about. Offered to the model as examples only.
pub const PAYMENT_METHODS: &[&str] = &[
    "Boleto",
    "Pix",
    "Dinheiro",
    "Cartão de Crédito",
    "Cartão de Débito",
    "Nubank",
    "Itaú",
    "Inter",
];

/// A category vocabulary plus the subset treated as fixed obligations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub categories: Vec<String>,
    pub fixed_obligations: Vec<String>,
    pub payment_methods: Vec<String>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            categories: to_owned(CATEGORIES),
            fixed_obligations: to_owned(FIXED_OBLIGATIONS),
            payment_methods: to_owned(PAYMENT_METHODS),
        }
    }
}

impl Taxonomy {
    /// Exact-match membership test.
    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn is_fixed_obligation(&self, category: &str) -> bool {
        self.fixed_obligations.iter().any(|c| c == category)
    }
}

fn to_owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}
