use crate::infra::{parse_date, InMemoryDocumentStore, SandboxVerificationClient};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use rental_desk::error::AppError;
use rental_desk::rentals::{
    CustomerDetails, DocumentKind, DocumentUpload, LifecycleError, PaymentStatus,
    RentalLifecycleService, RentalRequest, RentalStatus, RentalSubmission,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// First rental day (YYYY-MM-DD). Defaults to tomorrow.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Rental length in days.
    #[arg(long, default_value_t = 7)]
    pub(crate) days: i64,
    #[arg(long, default_value_t = 500)]
    pub(crate) rent: i64,
    #[arg(long, default_value_t = 2000)]
    pub(crate) deposit: i64,
    #[arg(long, default_value_t = 1000)]
    pub(crate) advance: i64,
    /// Have the sandbox registry refuse the tax ID, to show that automated checks are advisory.
    #[arg(long)]
    pub(crate) refuse_tax_id: bool,
}

const DEMO_TAX_ID: &str = "ABCDE1234F";

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = args
        .start
        .unwrap_or_else(|| Local::now().date_naive() + Duration::days(1));
    let end = start + Duration::days(args.days);

    let verifier = if args.refuse_tax_id {
        SandboxVerificationClient::refusing([DEMO_TAX_ID])
    } else {
        SandboxVerificationClient::default()
    };
    let service = RentalLifecycleService::new(
        Arc::new(InMemoryDocumentStore::default()),
        Arc::new(verifier),
    );

    let record = service.submit(RentalSubmission {
        user_id: "demo-user".to_string(),
        product_id: "camera-kit".to_string(),
        product_name: Some("Mirrorless camera kit".to_string()),
        customer_details: CustomerDetails {
            full_name: "Demo Customer".to_string(),
            email: "demo@example.com".to_string(),
            phone: "+91 90000 00000".to_string(),
            address: "1 Market Street".to_string(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
        },
        national_id: DocumentUpload {
            number: "4567 8901 2345".to_string(),
            image_ref: None,
        },
        tax_id: DocumentUpload {
            number: DEMO_TAX_ID.to_lowercase(),
            image_ref: None,
        },
        start_date: start,
        end_date: end,
        rent_amount: args.rent,
        security_deposit: args.deposit,
        advance_payment: args.advance,
    })?;
    render_request("Submitted", &record);

    let id = record.id.clone();
    service.transition_status(&id, RentalStatus::DocumentVerification, None)?;

    for kind in DocumentKind::ALL {
        let outcome = service.run_automated_verification(&id, kind).await?;
        match LifecycleError::from_outcome(kind, &outcome) {
            None => println!("Automated check {}: valid", kind.label()),
            Some(error) => println!("Automated check {}: {error}", kind.label()),
        }
    }

    match service.transition_status(&id, RentalStatus::Approved, None) {
        Err(LifecycleError::DocumentsNotVerified { outstanding }) => {
            println!("Approval blocked, outstanding: {}", outstanding.join(", "));
        }
        Err(other) => return Err(other.into()),
        Ok(_) => println!("Approval unexpectedly allowed before manual review"),
    }

    for kind in DocumentKind::ALL {
        service.approve_document(&id, kind, Some("checked against upload"))?;
    }
    service.set_cheque_submitted(&id, true)?;
    service.transition_status(&id, RentalStatus::Approved, Some("documents in order"))?;
    service.record_payment_event(&id, PaymentStatus::AdvancePaid, None)?;
    service.transition_status(&id, RentalStatus::Delivered, None)?;
    service.record_payment_event(&id, PaymentStatus::FullyPaid, None)?;
    service.transition_status(&id, RentalStatus::Returned, None)?;
    let record =
        service.record_payment_event(&id, PaymentStatus::Refunded, Some("deposit returned"))?;
    render_request("Closed", &record);

    let summary = service.summary()?;
    println!(
        "Summary: {} request(s), outstanding balance {}, refundable deposits {}",
        summary.total, summary.outstanding_balance, summary.refundable_deposits
    );
    Ok(())
}

fn render_request(heading: &str, record: &RentalRequest) {
    let terms = &record.rental_terms;
    println!("{heading} {}", record.id);
    println!(
        "  status: {} / payment: {}",
        record.status.label(),
        record.payment_status.label()
    );
    println!(
        "  {} to {} ({} days)",
        terms.start_date, terms.end_date, terms.duration_days
    );
    println!(
        "  rent {} + deposit {} = {} (advance {})",
        terms.rent_amount, terms.security_deposit, terms.total_amount, terms.advance_payment
    );
    if !record.admin_notes.is_empty() {
        println!("  notes:");
        for line in record.admin_notes.lines() {
            println!("    {line}");
        }
    }
}
