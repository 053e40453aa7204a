// src/services/employee_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::UserRole,
        employee::{
            CsvEmployeeRow, EmployeeDraft, ImportReport, ImportRowIssue, NewEmployee, RowFailure,
            NO_GROUP, REQUIRED_CSV_HEADERS,
        },
    },
    services::auth::hash_password,
};

const MIN_PASSWORD_LEN: usize = 8;

/// Cria a conta de login e o cadastro do funcionário de uma vez só.
#[async_trait]
pub trait EmployeeProvisioner: Send + Sync {
    async fn provision(&self, employee: NewEmployee) -> Result<Uuid, AppError>;
}

#[derive(Clone)]
pub struct EmployeeService {
    provisioner: Arc<dyn EmployeeProvisioner>,
    bcrypt_cost: u32,
}

impl EmployeeService {
    pub fn new(provisioner: Arc<dyn EmployeeProvisioner>, bcrypt_cost: u32) -> Self {
        Self { provisioner, bcrypt_cost }
    }

    /// Importa funcionários de um CSV, uma linha por vez.
    ///
    /// Só um cabeçalho incompleto (ou ilegível) falha a importação inteira; falhas
    /// de linha são acumuladas no relatório e a fila segue para a próxima.
    pub async fn import_csv(&self, data: &[u8]) -> Result<ImportReport, AppError> {
        // Só os cabeçalhos são aparados: a senha precisa chegar intacta
        let mut reader = ReaderBuilder::new()
            .trim(Trim::Headers)
            .flexible(true)
            .from_reader(data);

        let headers: StringRecord = reader
            .headers()?
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();

        let missing: Vec<&str> = REQUIRED_CSV_HEADERS
            .iter()
            .copied()
            .filter(|required| !headers.iter().any(|h| h == *required))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::MissingCsvHeaders(missing.join(", ")));
        }
        reader.set_headers(headers);

        let mut report = ImportReport::default();

        for (index, record) in reader.deserialize::<CsvEmployeeRow>().enumerate() {
            // linha 1 é o cabeçalho
            let line = index + 2;
            report.total += 1;

            let (email, outcome) = match record {
                Ok(row) => (non_empty(row.email.clone()), self.import_row(row).await),
                Err(e) => (
                    None,
                    Err(AppError::InvalidImportRow(ImportRowIssue::Malformed(e.to_string()))),
                ),
            };

            match outcome {
                Ok(employee_id) => {
                    report.succeeded += 1;
                    tracing::debug!(line, %employee_id, "Funcionário importado");
                }
                Err(error) => {
                    tracing::warn!(line, email = ?email, "Linha recusada na importação: {}", error);
                    report.failures.push(RowFailure { line, email, error });
                }
            }
        }

        tracing::info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed(),
            "Importação de funcionários concluída"
        );

        Ok(report)
    }

    async fn import_row(&self, row: CsvEmployeeRow) -> Result<Uuid, AppError> {
        let draft = validate_row(row)?;
        let password_hash = hash_password(&draft.password, self.bcrypt_cost).await?;

        self.provisioner
            .provision(NewEmployee {
                email: draft.email,
                password_hash,
                full_name: draft.full_name,
                position: draft.position,
                role: draft.role,
                phone: draft.phone,
                group_id: draft.group_id,
                address: draft.address,
                date_of_birth: draft.date_of_birth,
            })
            .await
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn row_issue(issue: ImportRowIssue) -> AppError {
    AppError::InvalidImportRow(issue)
}

/// Valida uma linha crua e devolve o rascunho do funcionário.
///
/// Os campos de texto são aparados e o e-mail vai em minúsculas; a senha é
/// usada exatamente como veio, só não pode estar em branco.
pub fn validate_row(row: CsvEmployeeRow) -> Result<EmployeeDraft, AppError> {
    let (Some(full_name), Some(email), Some(password), Some(position), Some(role)) = (
        non_empty(row.full_name),
        non_empty(row.email).map(|email| email.to_lowercase()),
        row.password.filter(|password| !password.trim().is_empty()),
        non_empty(row.position),
        non_empty(row.role),
    ) else {
        return Err(row_issue(ImportRowIssue::MissingFields));
    };

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(row_issue(ImportRowIssue::PasswordTooShort));
    }

    let role: UserRole = role
        .parse()
        .map_err(|_| row_issue(ImportRowIssue::UnknownRole(role.clone())))?;

    let group_id = match non_empty(row.group_id) {
        None => None,
        Some(raw) if raw.eq_ignore_ascii_case(NO_GROUP) => None,
        Some(raw) => Some(
            Uuid::parse_str(&raw).map_err(|_| row_issue(ImportRowIssue::InvalidGroupId(raw.clone())))?,
        ),
    };

    let date_of_birth = match non_empty(row.date_of_birth) {
        None => None,
        Some(raw) => Some(
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| row_issue(ImportRowIssue::InvalidDate(raw.clone())))?,
        ),
    };

    Ok(EmployeeDraft {
        email,
        password,
        full_name,
        position,
        role,
        phone: non_empty(row.phone),
        group_id,
        address: non_empty(row.address),
        date_of_birth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::i18n::Locale;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvisioner {
        created: Mutex<Vec<NewEmployee>>,
        taken_emails: Vec<&'static str>,
    }

    // Igualdade exata de e-mail, como um índice único sobre a coluna gravada
    #[async_trait]
    impl EmployeeProvisioner for FakeProvisioner {
        async fn provision(&self, employee: NewEmployee) -> Result<Uuid, AppError> {
            let mut created = self.created.lock().unwrap();
            if self.taken_emails.contains(&employee.email.as_str())
                || created.iter().any(|e| e.email == employee.email)
            {
                return Err(AppError::EmailAlreadyExists);
            }
            created.push(employee);
            Ok(Uuid::new_v4())
        }
    }

    fn service(provisioner: Arc<FakeProvisioner>) -> EmployeeService {
        EmployeeService::new(provisioner, 4)
    }

    fn row(full_name: &str, email: &str, password: &str, position: &str, role: &str) -> CsvEmployeeRow {
        CsvEmployeeRow {
            full_name: Some(full_name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
            position: Some(position.into()),
            role: Some(role.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_required_headers_fail_the_whole_import() {
        let provisioner = Arc::new(FakeProvisioner::default());
        let csv = "full_name,email,position\nBudi,budi@contoh.id,Host\n";

        let err = service(provisioner.clone()).import_csv(csv.as_bytes()).await.unwrap_err();
        match err {
            AppError::MissingCsvHeaders(missing) => assert_eq!(missing, "password, role"),
            other => panic!("erro inesperado: {:?}", other),
        }
        assert!(provisioner.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn row_failures_are_accumulated_and_the_queue_continues() {
        let provisioner = Arc::new(FakeProvisioner {
            taken_emails: vec!["dupe@contoh.id"],
            ..Default::default()
        });
        let csv = "\
full_name,email,password,position,role,group_id
Budi,budi@contoh.id,rahasia123,Host,staff,
Sari,sari@contoh.id,pendek,Host,staff,
Dewi,dewi@contoh.id,rahasia123,Host,boss,
Eka,dupe@contoh.id,rahasia123,Host,admin,
Fajar,fajar@contoh.id,rahasia123,Leader,leader,no-group
";

        let report = service(provisioner.clone()).import_csv(csv.as_bytes()).await.unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed(), 3);

        let lines: Vec<usize> = report.failures.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert!(matches!(
            report.failures[0].error,
            AppError::InvalidImportRow(ImportRowIssue::PasswordTooShort)
        ));
        assert!(matches!(
            &report.failures[1].error,
            AppError::InvalidImportRow(ImportRowIssue::UnknownRole(role)) if role == "boss"
        ));
        assert!(matches!(report.failures[2].error, AppError::EmailAlreadyExists));
        assert_eq!(report.failures[2].email.as_deref(), Some("dupe@contoh.id"));

        let created = provisioner.created.lock().unwrap();
        let emails: Vec<&str> = created.iter().map(|e| e.email.as_str()).collect();
        assert_eq!(emails, vec!["budi@contoh.id", "fajar@contoh.id"]);
        assert!(created.iter().all(|e| e.group_id.is_none()));
        assert_eq!(created[1].role, UserRole::Leader);
        assert!(bcrypt::verify("rahasia123", &created[0].password_hash).unwrap());
    }

    #[tokio::test]
    async fn headers_are_matched_ignoring_case_and_spaces() {
        let provisioner = Arc::new(FakeProvisioner::default());
        let csv = " Full_Name , EMAIL ,Password,Position,Role\nBudi , budi@contoh.id ,rahasia123,Host,Staff\n";

        let report = service(provisioner.clone()).import_csv(csv.as_bytes()).await.unwrap();
        assert_eq!(report.succeeded, 1);

        let created = provisioner.created.lock().unwrap();
        assert_eq!(created[0].full_name, "Budi");
        assert_eq!(created[0].email, "budi@contoh.id");
        assert_eq!(created[0].role, UserRole::Staff);
    }

    #[tokio::test]
    async fn padded_passwords_are_kept_as_typed() {
        let provisioner = Arc::new(FakeProvisioner::default());
        let csv = "\
full_name,email,password,position,role
Budi,budi@contoh.id,\" rahasia123 \",Host,staff
Sari,sari@contoh.id,\"  abcdefg \",Host,staff
Dewi,dewi@contoh.id,\"    \",Host,staff
";

        let report = service(provisioner.clone()).import_csv(csv.as_bytes()).await.unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].line, 4);
        assert!(matches!(
            report.failures[0].error,
            AppError::InvalidImportRow(ImportRowIssue::MissingFields)
        ));

        let created = provisioner.created.lock().unwrap();
        assert!(bcrypt::verify(" rahasia123 ", &created[0].password_hash).unwrap());
        assert!(!bcrypt::verify("rahasia123", &created[0].password_hash).unwrap());
        assert!(bcrypt::verify("  abcdefg ", &created[1].password_hash).unwrap());
    }

    #[tokio::test]
    async fn emails_differing_only_in_case_are_duplicates() {
        let provisioner = Arc::new(FakeProvisioner::default());
        let csv = "\
full_name,email,password,position,role
Budi,Budi@Contoh.id,rahasia123,Host,staff
Budi Lagi,budi@contoh.id,rahasia123,Host,staff
";

        let report = service(provisioner.clone()).import_csv(csv.as_bytes()).await.unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].line, 3);
        assert!(matches!(report.failures[0].error, AppError::EmailAlreadyExists));

        let created = provisioner.created.lock().unwrap();
        assert_eq!(created[0].email, "budi@contoh.id");
    }

    #[tokio::test]
    async fn summary_is_localized() {
        let provisioner = Arc::new(FakeProvisioner::default());
        let csv = "full_name,email,password,position,role\n,kosong@contoh.id,,,\n";

        let report = service(provisioner).import_csv(csv.as_bytes()).await.unwrap();
        let summary = report.into_summary(&Locale("id".to_string()));

        assert_eq!(summary.total, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].line, 2);
        assert_eq!(summary.failures[0].email.as_deref(), Some("kosong@contoh.id"));
        assert!(!summary.failures[0].reason.is_empty());
    }

    #[test]
    fn optional_fields_are_parsed() {
        let group = Uuid::new_v4();
        let mut raw = row("Budi", "budi@contoh.id", "rahasia123", "Host", "viewer");
        raw.group_id = Some(group.to_string());
        raw.date_of_birth = Some("1998-07-21".into());
        raw.phone = Some("  ".into());

        let draft = validate_row(raw).unwrap();
        assert_eq!(draft.group_id, Some(group));
        assert_eq!(draft.date_of_birth, NaiveDate::from_ymd_opt(1998, 7, 21));
        assert_eq!(draft.phone, None);
        assert_eq!(draft.role, UserRole::Viewer);
    }

    #[test]
    fn bad_group_and_date_are_rejected() {
        let mut raw = row("Budi", "budi@contoh.id", "rahasia123", "Host", "staff");
        raw.group_id = Some("grupo-7".into());
        assert!(matches!(
            validate_row(raw),
            Err(AppError::InvalidImportRow(ImportRowIssue::InvalidGroupId(_)))
        ));

        let mut raw = row("Budi", "budi@contoh.id", "rahasia123", "Host", "staff");
        raw.date_of_birth = Some("21/07/1998".into());
        assert!(matches!(
            validate_row(raw),
            Err(AppError::InvalidImportRow(ImportRowIssue::InvalidDate(_)))
        ));
    }

    #[test]
    fn password_length_counts_surrounding_spaces() {
        let draft = validate_row(row("Budi", "budi@contoh.id", "  abcdefg ", "Host", "staff")).unwrap();
        assert_eq!(draft.password, "  abcdefg ");

        assert!(matches!(
            validate_row(row("Budi", "budi@contoh.id", " abcde ", "Host", "staff")),
            Err(AppError::InvalidImportRow(ImportRowIssue::PasswordTooShort))
        ));
    }

    #[test]
    fn blank_required_field_is_missing() {
        let raw = row("Budi", "  ", "rahasia123", "Host", "staff");
        assert!(matches!(
            validate_row(raw),
            Err(AppError::InvalidImportRow(ImportRowIssue::MissingFields))
        ));
    }
}
