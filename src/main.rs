use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use listing_cache::{
    AppConfig, FileStorage, HttpListingApi, ListingRecord, ListingSession, Loaded, Resource,
    SearchFilters, TenantId,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "listing-cache", about = "Browse rental listings through the local cache")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listings you own
    Owned,
    /// Listings you expressed interest in
    Interests,
    /// Tenants matched to one of your listings
    Matches {
        listing_id: String,
        /// Also fetch each matched tenant's profile
        #[arg(long)]
        details: bool,
    },
    /// Live search
    Search {
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        district: Option<String>,
        #[arg(long)]
        area: Option<String>,
        #[arg(long)]
        bhk: Option<u32>,
        /// Maximum monthly rent
        #[arg(long)]
        rpm: Option<u64>,
        #[arg(long = "occupant-type")]
        occupant_types: Vec<String>,
    },
    /// Drop cached state for a resource and fetch it again
    Refresh {
        target: RefreshTarget,
        /// Listing whose matches to refetch
        #[arg(long)]
        listing_id: Option<String>,
    },
    /// Show a cached listing
    Show { listing_id: String },
    /// Express interest in a cached listing
    Interest { listing_id: String },
    /// Delete one of your listings
    Delete { listing_id: String },
    /// Show your profile
    Profile,
    /// Forget everything cached for this session
    Logout,
}

#[derive(Clone, Copy, ValueEnum)]
enum RefreshTarget {
    Owned,
    Interests,
    Matches,
}

fn tenant_lines(tenants: &[TenantId]) -> Vec<String> {
    if tenants.is_empty() {
        return vec!["No matches found.".to_string()];
    }
    tenants.iter().map(|tenant| format!("- {}", tenant)).collect()
}

fn print_tenants(tenants: &[TenantId]) {
    for line in tenant_lines(tenants) {
        println!("{}", line);
    }
}

fn print_listings(listings: &[ListingRecord]) {
    if listings.is_empty() {
        println!("No listings found.");
        return;
    }
    for (i, listing) in listings.iter().enumerate() {
        println!("{}. {} BHK in {}, {} ({} / month)", i + 1, listing.bhk, listing.area, listing.district, listing.rpm);
        println!("   State: {}", listing.state);
        println!("   Available: {}", listing.date_available.format("%d %b %Y"));
        let address = listing.rental_information.address();
        if !address.is_empty() {
            println!("   Address: {}", address);
        }
        if !listing.highlights.is_empty() {
            println!("   Highlights: {}", listing.highlights.join(", "));
        }
        println!("   ID: {}", listing.listing_id);
        println!();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let storage = FileStorage::open(&config.cache_dir).context("Failed to open cache directory")?;
    let api = HttpListingApi::new(&config.api_base_url, config.request_timeout)
        .context("Failed to create API client")?;
    let session = ListingSession::open(Arc::new(storage), Arc::new(api), config.session_options())
        .context("Failed to open listing cache")?;

    if let Some(credential) = config.credential() {
        session.credentials().sign_in(credential);
    }

    match cli.command {
        Command::Owned => print_listings(&session.owned_listings().await?),
        Command::Interests => print_listings(&session.interests().await?),
        Command::Matches { listing_id, details } => {
            let tenants = session.matches_for(&listing_id).await?;
            if !details || tenants.is_empty() {
                print_tenants(&tenants);
            } else {
                for tenant in &tenants {
                    match session.tenant_profile(tenant).await? {
                        Some(profile) => {
                            println!("- {} <{}>", profile.name, profile.email_id);
                            if let Some(contact) = &profile.contact_num {
                                println!("   Contact: {}", contact);
                            }
                            if let Some(gender) = &profile.gender {
                                println!("   Gender: {}", gender);
                            }
                        }
                        None => println!("- {} (profile not found)", tenant),
                    }
                }
            }
        }
        Command::Search {
            state,
            district,
            area,
            bhk,
            rpm,
            occupant_types,
        } => {
            let filters = SearchFilters {
                state,
                district,
                area,
                bhk,
                rpm,
                occupant_types,
            };
            print_listings(&session.search(&filters).await?);
        }
        Command::Refresh { target, listing_id } => {
            let resource = match target {
                RefreshTarget::Owned => Resource::OwnedListings,
                RefreshTarget::Interests => Resource::Interests,
                RefreshTarget::Matches => Resource::MatchesFor(
                    listing_id.context("--listing-id is required to refresh matches")?,
                ),
            };
            match session.refresh(&resource).await? {
                Loaded::Listings(listings) => print_listings(&listings),
                Loaded::Matches(tenants) => {
                    info!("🔄 {} match(es) after refresh", tenants.len());
                    print_tenants(&tenants);
                }
            }
        }
        Command::Show { listing_id } => match session.find_listing(&listing_id)? {
            Some(listing) => {
                session.select_listing(&listing)?;
                println!("{}", serde_json::to_string_pretty(&listing)?);
            }
            None => println!("Listing {} was not found. It may have been deleted by the owner.", listing_id),
        },
        Command::Interest { listing_id } => {
            let listing = session
                .find_listing(&listing_id)?
                .with_context(|| format!("Listing {} is not cached; search for it first", listing_id))?;
            let message = session.express_interest(&listing).await?;
            println!("{}. We let the owner know that you are interested in this listing.", message);
        }
        Command::Delete { listing_id } => {
            let owner_id = session
                .find_listing(&listing_id)?
                .map(|l| l.owner_id)
                .with_context(|| format!("Listing {} is not cached; run `owned` first", listing_id))?;
            let message = session.delete_listing(&listing_id, &owner_id).await?;
            println!("{}", message);
        }
        Command::Profile => match session.load_profile().await? {
            Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
            None => println!("No profile found."),
        },
        Command::Logout => {
            session.clear_session()?;
            info!("💾 Cleared cached listings and indexes");
        }
    }

    Ok(())
}
