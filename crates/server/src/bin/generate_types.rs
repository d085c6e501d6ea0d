//! Writes the TypeScript declarations for every API type to `shared/types.ts`.
//! Pass `--check` to fail instead of writing when the file is out of date.

use std::{env, fs, path::Path, process::ExitCode};

use ts_rs::TS;

const OUTPUT: &str = "shared/types.ts";

fn generate() -> String {
    let decls = [
        utils::response::ApiResponse::<(), ()>::decl(),
        db::models::user::UserRole::decl(),
        db::models::user::User::decl(),
        db::models::user::RoleCount::decl(),
        db::models::genre::Genre::decl(),
        db::models::genre::UpsertGenre::decl(),
        db::models::artist::Artist::decl(),
        db::models::artist::UpsertArtist::decl(),
        db::models::band::Band::decl(),
        db::models::band::BandWithGenre::decl(),
        db::models::band::UpsertBand::decl(),
        db::models::composition::Composition::decl(),
        db::models::composition::Track::decl(),
        db::models::composition::UpsertComposition::decl(),
        db::models::release::Release::decl(),
        db::models::release::UpsertRelease::decl(),
        db::models::manufacturer_profile::ManufacturerProfile::decl(),
        db::models::manufacturer_profile::ManufacturerWithUser::decl(),
        db::models::manufacturer_profile::UpsertManufacturerProfile::decl(),
        db::models::record::RecordType::decl(),
        db::models::record::RecordSort::decl(),
        db::models::record::Record::decl(),
        db::models::record::RecordSummary::decl(),
        db::models::record::CreateRecord::decl(),
        db::models::record::UpdateRecord::decl(),
        db::models::web_session::CartLine::decl(),
        db::models::web_session::Cart::decl(),
        db::models::order::OrderStatus::decl(),
        db::models::order::PaymentMethod::decl(),
        db::models::order::Order::decl(),
        db::models::order::OrderItem::decl(),
        db::models::order::OrderItemDetail::decl(),
        db::models::order::OrderWithItems::decl(),
        db::models::order::StatusCount::decl(),
        services::services::auth::RegisterRequest::decl(),
        services::services::auth::LoginRequest::decl(),
        services::services::auth::UpdateProfileRequest::decl(),
        services::services::catalog::RecordQuery::decl(),
        services::services::catalog::RecordPage::decl(),
        services::services::catalog::RecordDetail::decl(),
        services::services::catalog::BandDetail::decl(),
        services::services::catalog::ReleaseDetail::decl(),
        services::services::cart::CartLineView::decl(),
        services::services::cart::CartView::decl(),
        services::services::cart::AddToCart::decl(),
        services::services::cart::SetCartQuantity::decl(),
        services::services::checkout::CheckoutRequest::decl(),
        services::services::orders::UpdateOrderStatus::decl(),
        services::services::orders::OrderListQuery::decl(),
        services::services::inventory::RecordInput::decl(),
        services::services::admin::Dashboard::decl(),
        services::services::admin::CreateManufacturer::decl(),
        services::services::admin::ChangeRole::decl(),
        services::services::database_validator::ValidationResult::decl(),
    ];

    let mut out = String::from("// This file was generated by `generate_types`. Do not edit by hand.\n\n");
    for decl in decls {
        out.push_str("export ");
        out.push_str(&decl);
        out.push_str("\n\n");
    }
    out
}

fn main() -> ExitCode {
    let check = env::args().skip(1).any(|arg| arg == "--check");
    let generated = generate();
    let path = Path::new(OUTPUT);

    if check {
        return match fs::read_to_string(path) {
            Ok(current) if current == generated => {
                println!("{OUTPUT} is up to date");
                ExitCode::SUCCESS
            }
            _ => {
                eprintln!("{OUTPUT} is out of date; run generate_types");
                ExitCode::FAILURE
            }
        };
    }

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("failed to create {}: {}", parent.display(), e);
            return ExitCode::FAILURE;
        }
    }
    match fs::write(path, generated) {
        Ok(()) => {
            println!("Wrote {OUTPUT}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to write {OUTPUT}: {}", e);
            ExitCode::FAILURE
        }
    }
}
