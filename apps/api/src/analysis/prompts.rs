// All LLM prompt text for the analysis run.
// The instructions are French, like the UI. Inputs are appended, never substituted,
// so braces or placeholder-looking text inside a CV reach the model untouched.

/// Recruiter evaluation in four parts, ending with a score out of 100.
pub const EVALUATION_INSTRUCTIONS: &str = "Mets-toi dans la peau d'un recruteur. J'ai reçu ce CV et je veux que tu m'aides à l'évaluer. Tu vas me faire une analyse en 4 parties.

Partie 1 : Un résumé rapide du profil du candidat
Partie 2 : Les points forts du profil par rapport à ma fiche de poste
Partie 3 : Les points de vigilance du profil par rapport à ma fiche de poste
Partie 4 : Une note sur 100 du profil avec une synthèse de son analyse";

/// Rewrite rules: no invented experience, strengths line, 6 skills, 10 keywords,
/// matching missions, bold results, spelling.
pub const OPTIMIZATION_INSTRUCTIONS: &str = "Agis en tant qu'expert en recrutement et optimise mon CV pour qu'il réponde précisément à l'offre d'emploi suivante. N'ajoute aucune nouvelle expérience professionnelle au CV.

Ajoute en dessous du titre une liste concise et impactante en moins de 70 caractères des 3 atouts clés du CV par rapport à l'offre d'emploi intitulée [Mes atouts clés].

En dessous, liste 6 compétences de mon CV qui correspondent à l'offre d'emploi en les intitulant [Compétences clés].

Intègre les 10 mots-clés essentiels de l'annonce dans ta proposition que tu inséreras dans l'expérience professionnelle ou les atouts clés.

Assure-toi de mettre en avant les missions de mes expériences professionnelles en lien avec les missions de l'offre d'emploi.

Mets en valeur [en gras] les résultats chiffrés et qualitatifs dans chacune des expériences professionnelles sans créer une partie distincte. Surtout n'ajoute aucun résultat dans les expériences professionnelles.

Corrige les fautes d'orthographe et coquilles.";

const CV_LABEL: &str = "CV:";
const EVALUATION_JOB_LABEL: &str = "Fiche de poste:";
const OPTIMIZATION_JOB_LABEL: &str = "Offre d'emploi:";

pub fn build_evaluation_prompt(cv_text: &str, job_text: &str) -> String {
    assemble(EVALUATION_INSTRUCTIONS, cv_text, EVALUATION_JOB_LABEL, job_text)
}

pub fn build_optimization_prompt(cv_text: &str, job_text: &str) -> String {
    assemble(OPTIMIZATION_INSTRUCTIONS, cv_text, OPTIMIZATION_JOB_LABEL, job_text)
}

fn assemble(instructions: &str, cv_text: &str, job_label: &str, job_text: &str) -> String {
    format!("{instructions}\n\n{CV_LABEL}\n{cv_text}\n\n{job_label}\n{job_text}")
}
