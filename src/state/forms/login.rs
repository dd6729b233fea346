//! Login form

use super::demo_form::{DemoForm, FieldRow};
use crate::form::{
    FieldOptions, FieldPath, FormController, FormError, FormOptions, Rules, ValidationMode, Value,
};

pub fn login_form(
    mode: ValidationMode,
    revalidate_mode: ValidationMode,
) -> Result<DemoForm, FormError> {
    let mut form = FormController::new(FormOptions {
        default_values: Value::object([("email", Value::text("")), ("password", Value::text(""))]),
        mode,
        revalidate_mode,
    });
    form.register(
        &FieldPath::of("email"),
        FieldOptions::text().rules(Rules::new().required("Email is required")),
    )?;
    form.register(
        &FieldPath::of("password"),
        FieldOptions::text().rules(Rules::new().required("Password is required")),
    )?;

    Ok(DemoForm::new("Login", form).with_rows([
        FieldRow::text("email", "Email"),
        FieldRow::text("password", "Password").masked(),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Edit;

    #[tokio::test]
    async fn test_empty_login_reports_both_fields() {
        let mut form = login_form(ValidationMode::OnSubmit, ValidationMode::OnChange).unwrap();
        let result = form.controller_mut().submit(|_| {}, |_| {}).await;
        assert!(!result.is_valid());
        assert_eq!(form.controller().errors().len(), 2);
    }

    #[test]
    fn test_password_is_masked() {
        let mut form = login_form(ValidationMode::OnChange, ValidationMode::OnChange).unwrap();
        form.move_focus(true);
        for c in "hunter2".chars() {
            let _ = form.edit(Edit::Insert(c)).unwrap();
        }
        let row = form.focused().unwrap().field;
        assert_eq!(form.display_value(&row), "•••••••");
        assert_eq!(
            form.controller().get_value(&row.path),
            Value::text("hunter2")
        );
        assert!(form.controller().error(&row.path).is_none());
    }
}
