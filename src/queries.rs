use std::fmt;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;

use crate::error::SckanError;

pub const SPECIES_PLACEHOLDER: &str = "{species_param}";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[A-Za-z_][A-Za-z0-9_]*\}").expect("placeholder pattern"));

const PREFIXES: &str = r#"PREFIX owl: <http://www.w3.org/2002/07/owl#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX partOf: <http://purl.obolibrary.org/obo/BFO_0000050>
PREFIX ilxtr: <http://uri.interlex.org/tgbugs/uris/readable/>
PREFIX oboInOwl: <http://www.geneontology.org/formats/oboInOwl#>
"#;

const NEURON_PATH: &str = r#"
SELECT DISTINCT ?Neuron_IRI ?Neuron_Label ?A ?Region_A ?B ?Region_B ?C ?Region_C ?Species ?Species_link
{
    ?Neuron_IRI rdfs:label ?Neuron_Label;
                ilxtr:hasSomaLocation ?A;
                ilxtr:hasAxonLocation ?C;
                (ilxtr:hasAxonTerminalLocation | ilxtr:hasAxonSensoryLocation) ?B.

    ?Neuron_IRI ilxtr:isObservedInSpecies ?Species_link.

    ?A (rdfs:label | oboInOwl:hasExactSynonym) ?Region_A.
    ?B (rdfs:label | oboInOwl:hasExactSynonym) ?Region_B.
    ?C (rdfs:label | oboInOwl:hasExactSynonym) ?Region_C.
    ?Species_link (rdfs:label | oboInOwl:hasExactSynonym) ?Species.

    FILTER (str(?Species) = "{species_param}")
}
ORDER BY ?Neuron_IRI ?Region_A ?Region_B ?Region_C ?Species
"#;

const NEURON_PATH_ALL_SPECIES: &str = r#"
SELECT DISTINCT ?Neuron_IRI ?Neuron_Label ?A ?Region_A ?B ?Region_B ?C ?Region_C ?Species ?Species_link
{
    ?Neuron_IRI rdfs:label ?Neuron_Label;
                ilxtr:hasSomaLocation ?A;
                ilxtr:hasAxonLocation ?C;
                (ilxtr:hasAxonTerminalLocation | ilxtr:hasAxonSensoryLocation) ?B.

    ?Neuron_IRI ilxtr:isObservedInSpecies ?Species_link.

    ?A (rdfs:label | oboInOwl:hasExactSynonym) ?Region_A.
    ?B (rdfs:label | oboInOwl:hasExactSynonym) ?Region_B.
    ?C (rdfs:label | oboInOwl:hasExactSynonym) ?Region_C.
    ?Species_link (rdfs:label | oboInOwl:hasExactSynonym) ?Species.
}
ORDER BY ?Neuron_IRI ?Region_A ?Region_B ?Region_C ?Species
"#;

// Still returns a few synonyms for some species.
const SPECIES_WITHOUT_SYNONYMS: &str = r#"
SELECT DISTINCT ?Species_link ?Species
{
    ?Neuron_IRI ilxtr:isObservedInSpecies ?Species_link.
    ?Species_link rdfs:label ?Species.
}
ORDER BY ?Species_link ?Species
"#;

const SPECIES_WITH_SYNONYMS: &str = r#"
SELECT DISTINCT ?Species_link ?Species
{
    ?Neuron_IRI ilxtr:isObservedInSpecies ?Species_link.
    ?Species_link (rdfs:label | oboInOwl:hasExactSynonym) ?Species.
}
ORDER BY ?Species_link ?Species
"#;

const REGIONS_WITH_SYNONYMS: &str = r#"
SELECT DISTINCT ?Region_URI ?Region
{
    ?Neuron_IRI (ilxtr:hasSomaLocation | ilxtr:hasAxonLocation | ilxtr:hasAxonTerminalLocation | ilxtr:hasAxonSensoryLocation) ?Region_URI.
    ?Neuron_IRI ilxtr:isObservedInSpecies ?Species_link.
    ?Species_link (rdfs:label | oboInOwl:hasExactSynonym) ?Species.
    ?Region_URI (rdfs:label | oboInOwl:hasExactSynonym) ?Region.

    FILTER (str(?Species) = "{species_param}")
}
ORDER BY ?Region_URI ?Region
"#;

const REGIONS_WITHOUT_SYNONYMS: &str = r#"
SELECT DISTINCT ?Region_URI ?Region
{
    ?Neuron_IRI (ilxtr:hasSomaLocation | ilxtr:hasAxonLocation | ilxtr:hasAxonTerminalLocation | ilxtr:hasAxonSensoryLocation) ?Region_URI.
    ?Neuron_IRI ilxtr:isObservedInSpecies ?Species_link.
    ?Species_link (rdfs:label | oboInOwl:hasExactSynonym) ?Species.
    ?Region_URI rdfs:label ?Region.

    FILTER (str(?Species) = "{species_param}")
}
ORDER BY ?Region_URI ?Region
"#;

const NEURON_PHENOTYPE: &str = r#"
SELECT DISTINCT ?Neuron_IRI ?Neuron_Label ?A ?Region_A ?B ?Region_B ?C ?Region_C ?Species ?Species_link ?Phenotype_link ?Phenotype
{
    ?Neuron_IRI rdfs:label ?Neuron_Label;
                ilxtr:hasSomaLocation ?A;
                ilxtr:hasAxonLocation ?C;
                (ilxtr:hasAxonTerminalLocation | ilxtr:hasAxonSensoryLocation) ?B.

    ?Neuron_IRI ilxtr:isObservedInSpecies ?Species_link.
    ?Neuron_IRI ilxtr:hasNeuronalPhenotype ?Phenotype_link.

    ?Species_link (rdfs:label | oboInOwl:hasExactSynonym) ?Species.
    ?Phenotype_link (rdfs:label | oboInOwl:hasExactSynonym) ?Phenotype.
    ?A (rdfs:label | oboInOwl:hasExactSynonym) ?Region_A.
    ?B (rdfs:label | oboInOwl:hasExactSynonym) ?Region_B.
    ?C (rdfs:label | oboInOwl:hasExactSynonym) ?Region_C.

    FILTER (str(?Species) = "{species_param}")
}
ORDER BY ?Phenotype_link ?Phenotype
"#;

const NEURON_CIRCUIT_ROLE: &str = r#"
SELECT DISTINCT ?Neuron_IRI ?Neuron_Label ?A ?Region_A ?B ?Region_B ?C ?Region_C ?Species ?Species_link ?Phenotype_link ?Phenotype
{
    ?Neuron_IRI rdfs:label ?Neuron_Label;
                ilxtr:hasSomaLocation ?A;
                ilxtr:hasAxonLocation ?C;
                (ilxtr:hasAxonTerminalLocation | ilxtr:hasAxonSensoryLocation) ?B.

    ?Neuron_IRI ilxtr:isObservedInSpecies ?Species_link.
    ?Neuron_IRI ilxtr:hasCircuitRole ?Phenotype_link.

    ?Species_link (rdfs:label | oboInOwl:hasExactSynonym) ?Species.
    ?Phenotype_link (rdfs:label | oboInOwl:hasExactSynonym) ?Phenotype.
    ?A (rdfs:label | oboInOwl:hasExactSynonym) ?Region_A.
    ?B (rdfs:label | oboInOwl:hasExactSynonym) ?Region_B.
    ?C (rdfs:label | oboInOwl:hasExactSynonym) ?Region_C.

    FILTER (str(?Species) = "{species_param}")
}
ORDER BY ?Phenotype_link ?Phenotype
"#;

const PHENOTYPES: &str = r#"
SELECT DISTINCT ?Phenotype_link ?Phenotype
{
    ?Neuron_IRI rdfs:label ?Neuron_Label;
                ilxtr:hasSomaLocation ?A;
                (ilxtr:hasAxonTerminalLocation | ilxtr:hasAxonSensoryLocation) ?B.

    ?Neuron_IRI ilxtr:isObservedInSpecies ?Species_link.
    ?Neuron_IRI ilxtr:hasNeuronalPhenotype ?Phenotype_link.

    ?Species_link (rdfs:label | oboInOwl:hasExactSynonym) ?Species.
    ?Phenotype_link (rdfs:label | oboInOwl:hasExactSynonym) ?Phenotype.

    FILTER (str(?Species) = "{species_param}")
}
ORDER BY ?Phenotype_link ?Phenotype
"#;

const CIRCUIT_ROLES: &str = r#"
SELECT DISTINCT ?Phenotype_link ?Phenotype
{
    ?Neuron_IRI rdfs:label ?Neuron_Label;
                ilxtr:hasSomaLocation ?A;
                (ilxtr:hasAxonTerminalLocation | ilxtr:hasAxonSensoryLocation) ?B.

    ?Neuron_IRI ilxtr:isObservedInSpecies ?Species_link.
    ?Neuron_IRI ilxtr:hasCircuitRole ?Phenotype_link.

    ?Species_link (rdfs:label | oboInOwl:hasExactSynonym) ?Species.
    ?Phenotype_link (rdfs:label | oboInOwl:hasExactSynonym) ?Phenotype.

    FILTER (str(?Species) = "{species_param}")
}
ORDER BY ?Phenotype_link ?Phenotype
"#;

/// Template for `rdfs:label` lookups of explicit URIs; `{uris}` takes a
/// comma separated list of `<uri>` terms.
const LABELS_FOR_URIS: &str = r#"
SELECT DISTINCT ?annotation ?label
WHERE {
    ?annotation rdfs:label ?label.

    FILTER (?annotation IN ({uris}))
}
ORDER BY ?annotation ?label
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamedQuery {
    NeuronPath,
    NeuronPathAllSpecies,
    SpeciesWithSynonyms,
    SpeciesWithoutSynonyms,
    RegionsWithSynonyms,
    RegionsWithoutSynonyms,
    NeuronPhenotype,
    NeuronCircuitRole,
    Phenotypes,
    CircuitRoles,
}

impl NamedQuery {
    pub fn template(&self) -> String {
        let body = match self {
            NamedQuery::NeuronPath => NEURON_PATH,
            NamedQuery::NeuronPathAllSpecies => NEURON_PATH_ALL_SPECIES,
            NamedQuery::SpeciesWithSynonyms => SPECIES_WITH_SYNONYMS,
            NamedQuery::SpeciesWithoutSynonyms => SPECIES_WITHOUT_SYNONYMS,
            NamedQuery::RegionsWithSynonyms => REGIONS_WITH_SYNONYMS,
            NamedQuery::RegionsWithoutSynonyms => REGIONS_WITHOUT_SYNONYMS,
            NamedQuery::NeuronPhenotype => NEURON_PHENOTYPE,
            NamedQuery::NeuronCircuitRole => NEURON_CIRCUIT_ROLE,
            NamedQuery::Phenotypes => PHENOTYPES,
            NamedQuery::CircuitRoles => CIRCUIT_ROLES,
        };
        format!("{PREFIXES}{body}")
    }

    pub fn needs_species(&self) -> bool {
        requires_species(&self.template())
    }
}

impl fmt::Display for NamedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .to_possible_value()
            .map(|value| value.get_name().to_string())
            .unwrap_or_default();
        write!(f, "{name}")
    }
}

pub fn requires_species(template: &str) -> bool {
    template.contains(SPECIES_PLACEHOLDER)
}

/// Fills the species placeholder and rejects any token left unfilled.
pub fn substitute(template: &str, species: Option<&str>) -> Result<String, SckanError> {
    let text = match species {
        Some(species) => template.replace(SPECIES_PLACEHOLDER, species),
        None => template.to_string(),
    };
    if let Some(token) = PLACEHOLDER_RE.find(&text) {
        return Err(SckanError::InvalidArgument(format!(
            "unfilled query placeholder {}",
            token.as_str()
        )));
    }
    Ok(text)
}

pub fn labels_for_uris<S: AsRef<str>>(uris: &[S]) -> String {
    let terms = uris
        .iter()
        .map(|uri| format!("<{}>", uri.as_ref()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{PREFIXES}{}", LABELS_FOR_URIS.replace("{uris}", &terms))
}
