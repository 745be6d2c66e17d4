use anyhow::Result;
use derive_more::Display;
use inquire::{Confirm, Editor, Password, Select, Text};
use pharmatrack::models::{ApprovalStatus, FileMeta, MedicineId, PharmacyId};
use pharmatrack::services::Service;
use pharmatrack::store::Store;
use pharmatrack::utils::files::file_meta_from_path;
use pharmatrack::utils::input_validation::{email_input_validation, required_text_input};
use std::path::PathBuf;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

const STORE_FILE: &str = "pharmatrack.json";
const LOG_FILE: &str = "./pharmatrack.log";

type MenuExit = Option<()>;
const MENU_EXIT: MenuExit = None;
const MENU_LOOP: MenuExit = Some(());

/// A text menu screen
trait Menu {
    /// Implements the body of the menu. Returns None to leave the
    /// menu, or Some(()) to show it again.
    fn enter(&mut self) -> Result<MenuExit>;

    /// Runs the menu in a loop, reporting errors without leaving,
    /// until the menu asks to exit.
    fn enter_loop(&mut self) {
        while let Some(result) = self.enter().transpose() {
            if let Err(error) = result {
                eprintln!("Error: {error}");
            }
        }
    }
}

pub struct App {
    service: Service,
}

impl App {
    pub fn new(service: Service) -> Self {
        App { service }
    }

    pub fn start(&mut self) -> Result<()> {
        println!("Welcome to PharmaTrack, the medicine approval registry.");
        self.enter_loop();
        self.service.save()?;
        Ok(())
    }
}

impl Menu for App {
    fn enter(&mut self) -> Result<MenuExit> {
        // A session left over from a previous run goes straight to the
        // administrative screens.
        if self.service.session().is_some() {
            let mut admin = AdminMenu {
                service: &mut self.service,
                quit: false,
            };
            admin.enter_loop();
            return Ok(if admin.quit { MENU_EXIT } else { MENU_LOOP });
        }

        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Log in")]
            Login,
            #[display("Quit")]
            Exit,
        }

        let choice = Select::new("What would you like to do?", Choice::iter().collect()).prompt()?;

        match choice {
            Choice::Login => {
                let email = email_input_validation("Email:")?;
                let password = Password::new("Password:")
                    .without_confirmation()
                    .with_display_mode(inquire::PasswordDisplayMode::Masked)
                    .prompt()?;

                self.service.login(&email, &password)?;
                println!("[*] Welcome, {}.", email);
                Ok(MENU_LOOP)
            }
            Choice::Exit => Ok(MENU_EXIT),
        }
    }
}

struct AdminMenu<'srv> {
    service: &'srv mut Service,
    quit: bool,
}

impl Menu for AdminMenu<'_> {
    fn enter(&mut self) -> Result<MenuExit> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Dashboard")]
            Dashboard,

            #[display("Pharmacies")]
            Pharmacies,

            #[display("Medicines")]
            Medicines,

            #[display("Log out")]
            Logout,

            #[display("Quit")]
            Exit,
        }

        let choice = Select::new("What would you like to do?", Choice::iter().collect()).prompt()?;
        match choice {
            Choice::Dashboard => DashboardMenu {
                service: self.service,
            }
            .enter_loop(),

            Choice::Pharmacies => PharmaciesMenu {
                service: self.service,
            }
            .enter_loop(),

            Choice::Medicines => MedicinesMenu {
                service: self.service,
            }
            .enter_loop(),

            Choice::Logout => {
                self.service.logout()?;
                return Ok(MENU_EXIT);
            }

            Choice::Exit => {
                self.quit = true;
                return Ok(MENU_EXIT);
            }
        };
        Ok(MENU_LOOP)
    }
}

/// An entry of a selection list, displayed by label but carrying the
/// record id.
#[derive(Display)]
#[display("{label}")]
struct RecordChoice<Id> {
    id: Id,
    label: String,
}

fn pharmacy_choices(service: &Service) -> Result<Vec<RecordChoice<PharmacyId>>> {
    Ok(service
        .list_pharmacies()?
        .into_iter()
        .map(|p| RecordChoice {
            id: p.id.clone(),
            label: format!("{} — {}", p.name, p.owner_name),
        })
        .collect())
}

fn medicine_choices<'m>(
    medicines: impl IntoIterator<Item = &'m pharmatrack::models::Medicine>,
) -> Vec<RecordChoice<MedicineId>> {
    medicines
        .into_iter()
        .map(|m| RecordChoice {
            id: m.id.clone(),
            label: format!("{} ({}) — {} {}%", m.name, m.company, m.status, m.progress),
        })
        .collect()
}

struct DashboardMenu<'srv> {
    service: &'srv mut Service,
}

impl Menu for DashboardMenu<'_> {
    fn enter(&mut self) -> Result<MenuExit> {
        let stats = self.service.stats()?;
        println!(
            "\nMedicines: {}   Pharmacies: {}\nPending: {}   Approved: {}   Rejected: {}\n",
            stats.total_medicines, stats.total_pharmacies, stats.pending, stats.approved,
            stats.rejected
        );

        #[derive(EnumIter, Display)]
        enum Filter {
            #[display("All medicines")]
            All,
            #[display("Pending approvals")]
            Pending,
            #[display("Approved medicines")]
            Approved,
            #[display("Rejected medicines")]
            Rejected,
            #[display("Back")]
            Back,
        }

        let filter = Select::new("Show:", Filter::iter().collect()).prompt()?;
        let choices = match filter {
            Filter::All => medicine_choices(self.service.list_medicines()?),
            Filter::Pending => {
                medicine_choices(self.service.list_medicines_by_status(ApprovalStatus::Pending)?)
            }
            Filter::Approved => {
                medicine_choices(self.service.list_medicines_by_status(ApprovalStatus::Approved)?)
            }
            Filter::Rejected => {
                medicine_choices(self.service.list_medicines_by_status(ApprovalStatus::Rejected)?)
            }
            Filter::Back => return Ok(MENU_EXIT),
        };

        if choices.is_empty() {
            println!("[*] No medicines to show");
            return Ok(MENU_LOOP);
        }

        let Some(choice) = Select::new("Choose a medicine:", choices).prompt_skippable()? else {
            return Ok(MENU_LOOP);
        };

        MedicineMenu {
            service: self.service,
            medicine_id: choice.id,
        }
        .enter_loop();
        Ok(MENU_LOOP)
    }
}

struct PharmaciesMenu<'srv> {
    service: &'srv mut Service,
}

impl Menu for PharmaciesMenu<'_> {
    fn enter(&mut self) -> Result<MenuExit> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Browse pharmacies")]
            Browse,
            #[display("Register a pharmacy")]
            Register,
            #[display("Back")]
            Back,
        }

        let choice = Select::new("Pharmacies:", Choice::iter().collect()).prompt()?;
        match choice {
            Choice::Browse => {
                let choices = pharmacy_choices(self.service)?;
                if choices.is_empty() {
                    println!("[*] No pharmacies registered yet");
                    return Ok(MENU_LOOP);
                }

                let Some(choice) =
                    Select::new("Choose a pharmacy:", choices).prompt_skippable()?
                else {
                    return Ok(MENU_LOOP);
                };

                PharmacyMenu {
                    service: self.service,
                    pharmacy_id: choice.id,
                }
                .enter_loop();
            }

            Choice::Register => {
                let name = required_text_input("Pharmacy name:")?;
                let owner_name = required_text_input("Owner name:")?;
                let license_number = required_text_input("License number:")?;
                let address = required_text_input("Address:")?;
                let phone = required_text_input("Phone:")?;
                let email = email_input_validation("Contact email:")?;

                let id = self.service.register_pharmacy(
                    name,
                    owner_name,
                    license_number,
                    address,
                    phone,
                    email,
                )?;
                println!("[*] Pharmacy registered with id {id}");
            }

            Choice::Back => return Ok(MENU_EXIT),
        };
        Ok(MENU_LOOP)
    }
}

struct PharmacyMenu<'srv> {
    service: &'srv mut Service,
    pharmacy_id: PharmacyId,
}

impl Menu for PharmacyMenu<'_> {
    fn enter(&mut self) -> Result<MenuExit> {
        let Ok(pharmacy) = self.service.get_pharmacy(&self.pharmacy_id) else {
            println!("[!] Pharmacy not found");
            return Ok(MENU_EXIT);
        };

        println!(
            "\n{}\nOwner: {}\nLicense: {}\nAddress: {}\nPhone: {}\nEmail: {}\nRegistered: {}",
            pharmacy.name,
            pharmacy.owner_name,
            pharmacy.license_number,
            pharmacy.address,
            pharmacy.phone,
            pharmacy.email,
            pharmacy.registration_date.format("%Y-%m-%d")
        );

        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("View a medicine of this pharmacy")]
            ViewMedicine,
            #[display("Register a medicine for this pharmacy")]
            RegisterMedicine,
            #[display("Back")]
            Back,
        }

        let choice = Select::new("What would you like to do?", Choice::iter().collect()).prompt()?;
        match choice {
            Choice::ViewMedicine => {
                let choices =
                    medicine_choices(self.service.medicines_of_pharmacy(&self.pharmacy_id)?);
                if choices.is_empty() {
                    println!("[*] This pharmacy has no medicines yet");
                    return Ok(MENU_LOOP);
                }

                let Some(choice) =
                    Select::new("Choose a medicine:", choices).prompt_skippable()?
                else {
                    return Ok(MENU_LOOP);
                };

                MedicineMenu {
                    service: self.service,
                    medicine_id: choice.id,
                }
                .enter_loop();
            }

            Choice::RegisterMedicine => {
                register_medicine(self.service, Some(self.pharmacy_id.clone()))?;
            }

            Choice::Back => return Ok(MENU_EXIT),
        };
        Ok(MENU_LOOP)
    }
}

struct MedicinesMenu<'srv> {
    service: &'srv mut Service,
}

impl Menu for MedicinesMenu<'_> {
    fn enter(&mut self) -> Result<MenuExit> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Browse medicines")]
            Browse,
            #[display("Register a medicine")]
            Register,
            #[display("Back")]
            Back,
        }

        let choice = Select::new("Medicines:", Choice::iter().collect()).prompt()?;
        match choice {
            Choice::Browse => {
                let choices = medicine_choices(self.service.list_medicines()?);
                if choices.is_empty() {
                    println!("[*] No medicines registered yet");
                    return Ok(MENU_LOOP);
                }

                let Some(choice) =
                    Select::new("Choose a medicine:", choices).prompt_skippable()?
                else {
                    return Ok(MENU_LOOP);
                };

                MedicineMenu {
                    service: self.service,
                    medicine_id: choice.id,
                }
                .enter_loop();
            }

            Choice::Register => {
                // Linking to a pharmacy is optional (Esc to skip).
                let pharmacies = pharmacy_choices(self.service)?;
                let pharmacy_id = if pharmacies.is_empty() {
                    None
                } else {
                    Select::new("Submitting pharmacy (Esc for none):", pharmacies)
                        .prompt_skippable()?
                        .map(|choice| choice.id)
                };

                register_medicine(self.service, pharmacy_id)?;
            }

            Choice::Back => return Ok(MENU_EXIT),
        };
        Ok(MENU_LOOP)
    }
}

/// The medicine registration form
fn register_medicine(service: &mut Service, pharmacy_id: Option<PharmacyId>) -> Result<()> {
    let name = required_text_input("Medicine name:")?;
    let company = required_text_input("Manufacturing company:")?;
    let description = Editor::new("Description:").prompt()?;

    let mut files: Vec<FileMeta> = Vec::new();
    while Confirm::new("Attach a document?")
        .with_default(false)
        .prompt()?
    {
        match prompt_attachment()? {
            Some(meta) => files.push(meta),
            None => break,
        }
    }

    let id = service.register_medicine(pharmacy_id, name, company, description, files)?;
    println!("[*] Medicine registered with id {id}");
    Ok(())
}

/// Prompts for a path and captures the file's metadata. Only the
/// metadata is kept; the content stays where it is.
fn prompt_attachment() -> Result<Option<FileMeta>> {
    let Some(path) = Text::new("Path to the document:").prompt_skippable()? else {
        return Ok(None);
    };
    match file_meta_from_path(&PathBuf::from(path)) {
        Ok(meta) => {
            println!("[*] Captured {meta}");
            Ok(Some(meta))
        }
        Err(error) => {
            eprintln!("Error: {error}");
            Ok(None)
        }
    }
}

struct MedicineMenu<'srv> {
    service: &'srv mut Service,
    medicine_id: MedicineId,
}

impl MedicineMenu<'_> {
    /// Redraws the detail view from the store, so every mutation done
    /// in this menu is reflected immediately.
    fn show(&self) -> Result<MenuExit> {
        let Ok(medicine) = self.service.get_medicine(&self.medicine_id) else {
            println!("[!] Medicine not found");
            return Ok(MENU_EXIT);
        };

        let filled = medicine.progress as usize / 10;
        println!(
            "\n{} — {}\nStatus: {}\nRegistered: {}",
            medicine.name,
            medicine.company,
            medicine.status,
            medicine.registration_date.format("%Y-%m-%d"),
        );
        if let Some(pharmacy_id) = &medicine.pharmacy_id {
            if let Ok(pharmacy) = self.service.get_pharmacy(pharmacy_id) {
                println!("Pharmacy: {}", pharmacy.name);
            }
        }
        if !medicine.description.is_empty() {
            println!("Description: {}", medicine.description);
        }
        println!(
            "Progress: [{}{}] {}%",
            "#".repeat(filled),
            "-".repeat(10 - filled),
            medicine.progress
        );
        for (i, stage) in medicine.approvals.iter().enumerate() {
            println!("  {}. {stage}", i + 1);
        }
        if !medicine.files.is_empty() {
            println!("Documents:");
            for file in &medicine.files {
                println!("  - {file}");
            }
        }
        Ok(MENU_LOOP)
    }
}

impl Menu for MedicineMenu<'_> {
    fn enter(&mut self) -> Result<MenuExit> {
        if self.show()?.is_none() {
            return Ok(MENU_EXIT);
        }

        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Review an approval stage")]
            ReviewStage,

            #[display("Edit the registration")]
            Edit,

            #[display("Attach a document")]
            AttachFile,

            #[display("Remove a document")]
            RemoveFile,

            #[display("Delete this medicine")]
            Delete,

            #[display("Back")]
            Back,
        }

        let choice = Select::new("What would you like to do?", Choice::iter().collect()).prompt()?;
        match choice {
            Choice::ReviewStage => {
                let medicine = self.service.get_medicine(&self.medicine_id)?;
                let stages: Vec<RecordChoice<usize>> = medicine
                    .approvals
                    .iter()
                    .enumerate()
                    .map(|(index, stage)| RecordChoice {
                        id: index,
                        label: stage.to_string(),
                    })
                    .collect();

                let Some(stage) = Select::new("Choose a stage:", stages).prompt_skippable()?
                else {
                    return Ok(MENU_LOOP);
                };

                // The review screen only offers approve and reject;
                // stages are never sent back to pending from here.
                #[derive(EnumIter, Display)]
                enum Verdict {
                    #[display("Approve")]
                    Approve,
                    #[display("Reject")]
                    Reject,
                }

                let verdict = Select::new("Verdict:", Verdict::iter().collect()).prompt()?;
                let new_status = match verdict {
                    Verdict::Approve => ApprovalStatus::Approved,
                    Verdict::Reject => ApprovalStatus::Rejected,
                };
                self.service
                    .set_stage_status(&self.medicine_id, stage.id, new_status)?;
            }

            Choice::Edit => {
                let medicine = self.service.get_medicine(&self.medicine_id)?;
                let current_name = medicine.name.clone();
                let current_company = medicine.company.clone();
                let current_description = medicine.description.clone();

                let name = Text::new("Medicine name:")
                    .with_initial_value(&current_name)
                    .prompt()?;
                let company = Text::new("Manufacturing company:")
                    .with_initial_value(&current_company)
                    .prompt()?;
                let description = Editor::new("Description:")
                    .with_predefined_text(&current_description)
                    .prompt()?;

                self.service
                    .update_medicine(&self.medicine_id, name, company, description)?;
            }

            Choice::AttachFile => {
                if let Some(meta) = prompt_attachment()? {
                    self.service.attach_file(&self.medicine_id, meta)?;
                }
            }

            Choice::RemoveFile => {
                let medicine = self.service.get_medicine(&self.medicine_id)?;
                if medicine.files.is_empty() {
                    println!("[*] No documents attached");
                    return Ok(MENU_LOOP);
                }
                let files: Vec<RecordChoice<usize>> = medicine
                    .files
                    .iter()
                    .enumerate()
                    .map(|(index, file)| RecordChoice {
                        id: index,
                        label: file.to_string(),
                    })
                    .collect();

                let Some(file) = Select::new("Choose a document:", files).prompt_skippable()?
                else {
                    return Ok(MENU_LOOP);
                };
                self.service.remove_file(&self.medicine_id, file.id)?;
            }

            Choice::Delete => {
                if Confirm::new("Are you sure you want to delete this medicine?")
                    .with_help_message("The registration and its approval checklist will be lost.")
                    .prompt()?
                {
                    self.service.delete_medicine(&self.medicine_id)?;
                    println!("[*] Medicine deleted");
                    return Ok(MENU_EXIT);
                }
            }

            Choice::Back => return Ok(MENU_EXIT),
        };
        Ok(MENU_LOOP)
    }
}

fn main() -> anyhow::Result<()> {
    simple_logging::log_to_file(LOG_FILE, log::LevelFilter::Info)?;

    let store = Store::open(STORE_FILE.into())?;
    App::new(Service::new(store)).start()
}
