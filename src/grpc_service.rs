//! gRPC service implementation for the equb backend
//!
//! This module implements the EqubService gRPC handlers using tonic.
//! The proto definitions are compiled at build time via build.rs.

use crate::auth;
use crate::error::AppError;
use crate::models::{
    BroadcastTarget, Contribution, ContributionFilter, ContributionStatus, Cycle, Equb,
    EqubFilter, EqubStatus, EqubType, MembershipStatus, NewProfile, Profile, ProfileChanges,
    Winner,
};
use crate::rules;
use crate::AppState;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{error, info};
use uuid::Uuid;

// Include the generated proto code
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/equb.rs"));

    /// File descriptor set for gRPC reflection
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        include_bytes!(concat!(env!("OUT_DIR"), "/equb_descriptor.bin"));
}

use proto::equb_service_server::{EqubService as EqubRpc, EqubServiceServer};
use proto::{
    AdviceRequest, AdviceResponse, BroadcastRequest, BroadcastResponse, ConfirmWinnerRequest,
    ContributionIdRequest, ContributionListResponse, ContributionResponse, CsvExportResponse,
    DashboardResponse, DecideMembershipRequest, DeleteEqubResponse, DrawResponse,
    EqubDetailsResponse, EqubIdRequest, EqubListResponse, EqubMember, EqubResponse,
    GetDashboardRequest, GetProfileRequest, ListContributionsRequest, ListEqubsRequest,
    ListMembersRequest, ListMyContributionsRequest, ListMyEqubsRequest, ListNotificationsRequest,
    ListPendingRequestsRequest, ListProfilesRequest, MarkNotificationsReadRequest, MarkNotificationsReadResponse,
    MembershipListResponse, MembershipResponse, NamedAmount, NotificationListResponse,
    NotificationResponse, ProfileListResponse, ProfileResponse, RegisterProfileRequest,
    SetProfileActiveRequest, UpdateEqubRequest, UpdateProfileRequest, WinnerResponse,
};

/// gRPC service implementation
pub struct EqubGrpcService {
    app_state: Arc<AppState>,
}

impl EqubGrpcService {
    /// Create a new gRPC service
    pub fn new(app_state: Arc<AppState>) -> Self {
        Self { app_state }
    }

    /// Create a tonic server for this service
    pub fn into_server(self) -> EqubServiceServer<Self> {
        EqubServiceServer::new(self)
    }

    /// Convert AppError to tonic Status
    fn to_status(err: AppError) -> Status {
        match err {
            AppError::NotFound(msg) => Status::not_found(msg),
            AppError::Unauthorized(msg) => Status::unauthenticated(msg),
            AppError::Forbidden(msg) => Status::permission_denied(msg),
            AppError::Validation(msg) => Status::invalid_argument(msg),
            AppError::BusinessLogic(msg) => Status::failed_precondition(msg),
            AppError::ExternalService(msg) => Status::unavailable(msg),
            AppError::Database(_) | AppError::Sqlx(_) => {
                error!("Database error: {:?}", err);
                Status::internal("Database error")
            }
            _ => {
                error!("Internal error: {:?}", err);
                Status::internal("Internal server error")
            }
        }
    }

    /// Helper to parse UUID from string
    fn parse_uuid(s: &str, field_name: &str) -> Result<Uuid, Status> {
        Uuid::parse_str(s.trim())
            .map_err(|_| Status::invalid_argument(format!("Invalid {}: {}", field_name, s)))
    }

    fn parse_decimal(s: &str, field_name: &str) -> Result<Decimal, Status> {
        Decimal::from_str(s.trim())
            .map_err(|_| Status::invalid_argument(format!("Invalid {}: {}", field_name, s)))
    }

    fn parse_date(s: &str, field_name: &str) -> Result<NaiveDate, Status> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            Status::invalid_argument(format!("Invalid {} (expected YYYY-MM-DD): {}", field_name, s))
        })
    }

    /// Parse an enumerated field; empty means "not given"
    fn parse_optional<T: FromStr<Err = String>>(s: &str) -> Result<Option<T>, Status> {
        if s.trim().is_empty() {
            return Ok(None);
        }
        s.parse::<T>().map(Some).map_err(Status::invalid_argument)
    }

    fn non_empty(s: String) -> Option<String> {
        if s.trim().is_empty() {
            None
        } else {
            Some(s)
        }
    }

    /// Resolve the calling profile from the `x-user-id` header
    async fn caller<T>(&self, request: &Request<T>) -> Result<Profile, Status> {
        let id = auth::caller_id(request.metadata()).map_err(Self::to_status)?;
        self.app_state
            .profiles
            .authenticate(id)
            .await
            .map_err(Self::to_status)
    }

    fn equb_input(input: proto::EqubInput) -> Result<crate::models::EqubInput, Status> {
        let equb_type = input
            .equb_type
            .parse::<EqubType>()
            .map_err(Status::invalid_argument)?;
        let cycle = input.cycle.parse::<Cycle>().map_err(Status::invalid_argument)?;
        let next_due_date = if input.next_due_date.trim().is_empty() {
            None
        } else {
            Some(Self::parse_date(&input.next_due_date, "next_due_date")?)
        };

        Ok(crate::models::EqubInput {
            name: input.name,
            equb_type,
            contribution_amount: Self::parse_decimal(
                &input.contribution_amount,
                "contribution_amount",
            )?,
            cycle,
            max_members: input.max_members,
            status: Self::parse_optional::<EqubStatus>(&input.status)?,
            start_date: Self::parse_date(&input.start_date, "start_date")?,
            next_due_date,
        })
    }

    /// Money on the wire always carries two decimal places
    fn money(amount: Decimal) -> String {
        let mut amount = amount.round_dp(2);
        amount.rescale(2);
        amount.to_string()
    }

    fn profile_response(profile: Profile) -> ProfileResponse {
        ProfileResponse {
            id: profile.id.to_string(),
            full_name: profile.full_name,
            email: profile.email.unwrap_or_default(),
            phone: profile.phone,
            location: profile.location,
            role: profile.role,
            wallet_balance: Self::money(profile.wallet_balance),
            is_active: profile.is_active,
            updated_at: profile.updated_at.and_utc().timestamp(),
        }
    }

    fn equb_response(equb: Equb, approved_members: i64) -> EqubResponse {
        EqubResponse {
            id: equb.id.to_string(),
            created_at: equb.created_at.and_utc().timestamp(),
            created_by: equb.created_by.to_string(),
            name: equb.name,
            equb_type: equb.equb_type,
            contribution_amount: Self::money(equb.contribution_amount),
            cycle: equb.cycle,
            max_members: equb.max_members,
            status: equb.status,
            start_date: equb.start_date.to_string(),
            next_due_date: equb.next_due_date.to_string(),
            winnable_amount: Self::money(equb.winnable_amount),
            approved_members,
        }
    }

    fn contribution_response(contribution: Contribution) -> ContributionResponse {
        ContributionResponse {
            id: contribution.id.to_string(),
            equb_id: contribution.equb_id.to_string(),
            user_id: contribution.user_id.to_string(),
            date: contribution.date.to_string(),
            amount: Self::money(contribution.amount),
            status: contribution.status,
        }
    }

    fn winner_response(winner: Winner, equb_status: String) -> WinnerResponse {
        WinnerResponse {
            id: winner.id.to_string(),
            equb_id: winner.equb_id.to_string(),
            user_id: winner.user_id.to_string(),
            win_date: winner.win_date.to_string(),
            round: winner.round,
            equb_status,
        }
    }

    async fn equb_with_count(&self, equb: Equb) -> Result<EqubResponse, Status> {
        let approved = self
            .app_state
            .equbs
            .approved_count(equb.id)
            .await
            .map_err(Self::to_status)?;
        Ok(Self::equb_response(equb, approved))
    }

    async fn equb_list(&self, equbs: Vec<Equb>) -> Result<EqubListResponse, Status> {
        let mut responses = Vec::with_capacity(equbs.len());
        for equb in equbs {
            responses.push(self.equb_with_count(equb).await?);
        }
        Ok(EqubListResponse { equbs: responses })
    }
}

#[tonic::async_trait]
impl EqubRpc for EqubGrpcService {
    /// Register the calling user as a member
    async fn register_profile(
        &self,
        request: Request<RegisterProfileRequest>,
    ) -> Result<Response<ProfileResponse>, Status> {
        let id = auth::caller_id(request.metadata()).map_err(Self::to_status)?;
        let req = request.into_inner();
        info!("RegisterProfile request: id={}", id);

        if !req.id.trim().is_empty() && Self::parse_uuid(&req.id, "id")? != id {
            return Err(Status::invalid_argument(
                "Profile id must match the authenticated user",
            ));
        }

        let profile = self
            .app_state
            .profiles
            .register(NewProfile {
                id,
                full_name: req.full_name,
                email: Self::non_empty(req.email),
                phone: req.phone,
                location: req.location,
            })
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(Self::profile_response(profile)))
    }

    /// Own profile, or any profile for admins
    async fn get_profile(
        &self,
        request: Request<GetProfileRequest>,
    ) -> Result<Response<ProfileResponse>, Status> {
        let caller = self.caller(&request).await?;
        let req = request.into_inner();

        if req.user_id.trim().is_empty() {
            return Ok(Response::new(Self::profile_response(caller)));
        }

        let user_id = Self::parse_uuid(&req.user_id, "user_id")?;
        if user_id != caller.id {
            auth::require_admin(&caller).map_err(Self::to_status)?;
        }

        let profile = self
            .app_state
            .profiles
            .get(user_id)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(Self::profile_response(profile)))
    }

    async fn list_members(
        &self,
        request: Request<ListMembersRequest>,
    ) -> Result<Response<ProfileListResponse>, Status> {
        let caller = self.caller(&request).await?;
        let req = request.into_inner();

        let members = self
            .app_state
            .profiles
            .list_members(&caller, Some(req.search.as_str()))
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(ProfileListResponse {
            profiles: members.into_iter().map(Self::profile_response).collect(),
        }))
    }

    async fn list_profiles(
        &self,
        request: Request<ListProfilesRequest>,
    ) -> Result<Response<ProfileListResponse>, Status> {
        let caller = self.caller(&request).await?;

        let profiles = self
            .app_state
            .profiles
            .list(&caller)
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(ProfileListResponse {
            profiles: profiles.into_iter().map(Self::profile_response).collect(),
        }))
    }

    async fn update_profile(
        &self,
        request: Request<UpdateProfileRequest>,
    ) -> Result<Response<ProfileResponse>, Status> {
        let caller = self.caller(&request).await?;
        let req = request.into_inner();
        let user_id = Self::parse_uuid(&req.user_id, "user_id")?;

        let changes = ProfileChanges {
            full_name: Self::non_empty(req.full_name),
            email: Self::non_empty(req.email),
            phone: Self::non_empty(req.phone),
            location: Self::non_empty(req.location),
        };

        let profile = self
            .app_state
            .profiles
            .update(&caller, user_id, changes)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(Self::profile_response(profile)))
    }

    async fn set_profile_active(
        &self,
        request: Request<SetProfileActiveRequest>,
    ) -> Result<Response<ProfileResponse>, Status> {
        let caller = self.caller(&request).await?;
        let req = request.into_inner();
        let user_id = Self::parse_uuid(&req.user_id, "user_id")?;

        let profile = self
            .app_state
            .profiles
            .set_active(&caller, user_id, req.is_active)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(Self::profile_response(profile)))
    }

    async fn export_members_csv(
        &self,
        request: Request<ListMembersRequest>,
    ) -> Result<Response<CsvExportResponse>, Status> {
        let caller = self.caller(&request).await?;
        let req = request.into_inner();

        let content = self
            .app_state
            .profiles
            .export_members_csv(&caller, Some(req.search.as_str()))
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(CsvExportResponse {
            file_name: format!("members_export_{}.csv", Utc::now().date_naive()),
            content,
        }))
    }

    async fn create_equb(
        &self,
        request: Request<proto::EqubInput>,
    ) -> Result<Response<EqubResponse>, Status> {
        let caller = self.caller(&request).await?;
        let input = Self::equb_input(request.into_inner())?;
        info!("CreateEqub request: name={}", input.name);

        let equb = self
            .app_state
            .equbs
            .create(&caller, input)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(Self::equb_response(equb, 0)))
    }

    async fn update_equb(
        &self,
        request: Request<UpdateEqubRequest>,
    ) -> Result<Response<EqubResponse>, Status> {
        let caller = self.caller(&request).await?;
        let req = request.into_inner();
        let equb_id = Self::parse_uuid(&req.equb_id, "equb_id")?;
        let input = Self::equb_input(
            req.equb
                .ok_or_else(|| Status::invalid_argument("equb is required"))?,
        )?;

        let equb = self
            .app_state
            .equbs
            .update(&caller, equb_id, input)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(self.equb_with_count(equb).await?))
    }

    async fn delete_equb(
        &self,
        request: Request<EqubIdRequest>,
    ) -> Result<Response<DeleteEqubResponse>, Status> {
        let caller = self.caller(&request).await?;
        let equb_id = Self::parse_uuid(&request.into_inner().equb_id, "equb_id")?;

        self.app_state
            .equbs
            .delete(&caller, equb_id)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(DeleteEqubResponse { success: true }))
    }

    async fn get_equb(
        &self,
        request: Request<EqubIdRequest>,
    ) -> Result<Response<EqubResponse>, Status> {
        self.caller(&request).await?;
        let equb_id = Self::parse_uuid(&request.into_inner().equb_id, "equb_id")?;

        let equb = self
            .app_state
            .equbs
            .get(equb_id)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(self.equb_with_count(equb).await?))
    }

    async fn list_equbs(
        &self,
        request: Request<ListEqubsRequest>,
    ) -> Result<Response<EqubListResponse>, Status> {
        self.caller(&request).await?;
        let req = request.into_inner();

        let filter = EqubFilter {
            search: Self::non_empty(req.search),
            status: Self::parse_optional::<EqubStatus>(&req.status)?,
            equb_type: Self::parse_optional::<EqubType>(&req.equb_type)?,
        };

        let equbs = self
            .app_state
            .equbs
            .list(&filter)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(self.equb_list(equbs).await?))
    }

    async fn get_equb_details(
        &self,
        request: Request<EqubIdRequest>,
    ) -> Result<Response<EqubDetailsResponse>, Status> {
        self.caller(&request).await?;
        let equb_id = Self::parse_uuid(&request.into_inner().equb_id, "equb_id")?;

        let details = self
            .app_state
            .equbs
            .details(equb_id)
            .await
            .map_err(Self::to_status)?;

        let equb_status = details.equb.status.clone();
        let approved = details.members.len() as i64;
        Ok(Response::new(EqubDetailsResponse {
            equb: Some(Self::equb_response(details.equb, approved)),
            members: details
                .members
                .into_iter()
                .map(|(profile, join_date)| EqubMember {
                    profile: Some(Self::profile_response(profile)),
                    join_date: join_date.and_utc().timestamp(),
                })
                .collect(),
            winners: details
                .winners
                .into_iter()
                .map(|w| Self::winner_response(w, equb_status.clone()))
                .collect(),
        }))
    }

    async fn list_my_equbs(
        &self,
        request: Request<ListMyEqubsRequest>,
    ) -> Result<Response<EqubListResponse>, Status> {
        let caller = self.caller(&request).await?;

        let equbs = self
            .app_state
            .equbs
            .list_for_member(caller.id)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(self.equb_list(equbs).await?))
    }

    async fn request_join(
        &self,
        request: Request<EqubIdRequest>,
    ) -> Result<Response<MembershipResponse>, Status> {
        let caller = self.caller(&request).await?;
        let equb_id = Self::parse_uuid(&request.into_inner().equb_id, "equb_id")?;
        info!("RequestJoin request: user={}, equb={}", caller.id, equb_id);

        let membership = self
            .app_state
            .memberships
            .request_join(&caller, equb_id)
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(MembershipResponse {
            user_id: membership.user_id.to_string(),
            equb_id: membership.equb_id.to_string(),
            status: membership.status,
            join_date: membership.join_date.and_utc().timestamp(),
        }))
    }

    async fn list_pending_requests(
        &self,
        request: Request<ListPendingRequestsRequest>,
    ) -> Result<Response<MembershipListResponse>, Status> {
        let caller = self.caller(&request).await?;

        let pending = self
            .app_state
            .memberships
            .list_pending(&caller)
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(MembershipListResponse {
            memberships: pending
                .into_iter()
                .map(|p| MembershipResponse {
                    user_id: p.user_id.to_string(),
                    equb_id: p.equb_id.to_string(),
                    status: MembershipStatus::Pending.as_str().to_string(),
                    join_date: p.join_date.and_utc().timestamp(),
                })
                .collect(),
        }))
    }

    async fn decide_membership(
        &self,
        request: Request<DecideMembershipRequest>,
    ) -> Result<Response<MembershipResponse>, Status> {
        let caller = self.caller(&request).await?;
        let req = request.into_inner();
        let user_id = Self::parse_uuid(&req.user_id, "user_id")?;
        let equb_id = Self::parse_uuid(&req.equb_id, "equb_id")?;
        let decision = req
            .status
            .parse::<MembershipStatus>()
            .map_err(Status::invalid_argument)?;

        let membership = self
            .app_state
            .memberships
            .decide(&caller, user_id, equb_id, decision)
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(MembershipResponse {
            user_id: membership.user_id.to_string(),
            equb_id: membership.equb_id.to_string(),
            status: membership.status,
            join_date: membership.join_date.and_utc().timestamp(),
        }))
    }

    async fn submit_contribution(
        &self,
        request: Request<EqubIdRequest>,
    ) -> Result<Response<ContributionResponse>, Status> {
        let caller = self.caller(&request).await?;
        let equb_id = Self::parse_uuid(&request.into_inner().equb_id, "equb_id")?;

        let contribution = self
            .app_state
            .contributions
            .submit(&caller, equb_id)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(Self::contribution_response(contribution)))
    }

    async fn mark_contribution_paid(
        &self,
        request: Request<ContributionIdRequest>,
    ) -> Result<Response<ContributionResponse>, Status> {
        let caller = self.caller(&request).await?;
        let id = Self::parse_uuid(&request.into_inner().contribution_id, "contribution_id")?;

        let contribution = self
            .app_state
            .contributions
            .mark_paid(&caller, id)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(Self::contribution_response(contribution)))
    }

    async fn mark_contribution_late(
        &self,
        request: Request<ContributionIdRequest>,
    ) -> Result<Response<ContributionResponse>, Status> {
        let caller = self.caller(&request).await?;
        let id = Self::parse_uuid(&request.into_inner().contribution_id, "contribution_id")?;

        let contribution = self
            .app_state
            .contributions
            .mark_late(&caller, id)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(Self::contribution_response(contribution)))
    }

    async fn list_contributions(
        &self,
        request: Request<ListContributionsRequest>,
    ) -> Result<Response<ContributionListResponse>, Status> {
        let caller = self.caller(&request).await?;
        let req = request.into_inner();

        let filter = ContributionFilter {
            search: Self::non_empty(req.search),
            status: Self::parse_optional::<ContributionStatus>(&req.status)?,
        };

        let entries = self
            .app_state
            .contributions
            .list(&caller, &filter)
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(ContributionListResponse {
            contributions: entries
                .into_iter()
                .map(|e| ContributionResponse {
                    id: e.id.to_string(),
                    equb_id: e.equb_id.to_string(),
                    user_id: e.user_id.to_string(),
                    date: e.date.to_string(),
                    amount: Self::money(e.amount),
                    status: e.status,
                })
                .collect(),
        }))
    }

    async fn list_my_contributions(
        &self,
        request: Request<ListMyContributionsRequest>,
    ) -> Result<Response<ContributionListResponse>, Status> {
        let caller = self.caller(&request).await?;
        let req = request.into_inner();
        let equb_id = Self::parse_uuid(&req.equb_id, "equb_id")?;
        let status = Self::parse_optional::<ContributionStatus>(&req.status)?;

        let contributions = self
            .app_state
            .contributions
            .list_for_member(&caller, equb_id, status)
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(ContributionListResponse {
            contributions: contributions
                .into_iter()
                .map(Self::contribution_response)
                .collect(),
        }))
    }

    async fn list_eligible_members(
        &self,
        request: Request<EqubIdRequest>,
    ) -> Result<Response<ProfileListResponse>, Status> {
        let caller = self.caller(&request).await?;
        auth::require_admin(&caller).map_err(Self::to_status)?;
        let equb_id = Self::parse_uuid(&request.into_inner().equb_id, "equb_id")?;

        let eligible = self
            .app_state
            .draws
            .eligible(equb_id)
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(ProfileListResponse {
            profiles: eligible.into_iter().map(Self::profile_response).collect(),
        }))
    }

    /// Preview a random winner without recording it
    async fn draw_winner(
        &self,
        request: Request<EqubIdRequest>,
    ) -> Result<Response<DrawResponse>, Status> {
        let caller = self.caller(&request).await?;
        let equb_id = Self::parse_uuid(&request.into_inner().equb_id, "equb_id")?;
        info!("DrawWinner request: equb={}", equb_id);

        let preview = self
            .app_state
            .draws
            .draw(&caller, equb_id)
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(DrawResponse {
            equb_id: preview.equb_id.to_string(),
            candidate: Some(Self::profile_response(preview.candidate)),
            eligible_count: i32::try_from(preview.eligible_count).unwrap_or(i32::MAX),
        }))
    }

    async fn confirm_winner(
        &self,
        request: Request<ConfirmWinnerRequest>,
    ) -> Result<Response<WinnerResponse>, Status> {
        let caller = self.caller(&request).await?;
        let req = request.into_inner();
        let equb_id = Self::parse_uuid(&req.equb_id, "equb_id")?;
        let user_id = Self::parse_uuid(&req.user_id, "user_id")?;
        info!("ConfirmWinner request: equb={}, user={}", equb_id, user_id);

        let outcome = self
            .app_state
            .draws
            .confirm(&caller, equb_id, user_id)
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(Self::winner_response(
            outcome.winner,
            outcome.equb.status,
        )))
    }

    async fn broadcast_notification(
        &self,
        request: Request<BroadcastRequest>,
    ) -> Result<Response<BroadcastResponse>, Status> {
        let caller = self.caller(&request).await?;
        let req = request.into_inner();

        let target = match req.target_type.as_str() {
            "all_members" => BroadcastTarget::AllMembers,
            "specific_member" => {
                BroadcastTarget::Member(Self::parse_uuid(&req.target_id, "target_id")?)
            }
            "equb_members" => {
                BroadcastTarget::EqubMembers(Self::parse_uuid(&req.target_id, "target_id")?)
            }
            other => {
                return Err(Status::invalid_argument(format!(
                    "Invalid target_type: {}",
                    other
                )))
            }
        };

        let sent = self
            .app_state
            .notifications
            .broadcast(&caller, target, &req.message)
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(BroadcastResponse {
            sent: i32::try_from(sent).unwrap_or(i32::MAX),
        }))
    }

    async fn list_notifications(
        &self,
        request: Request<ListNotificationsRequest>,
    ) -> Result<Response<NotificationListResponse>, Status> {
        let caller = self.caller(&request).await?;
        let notifications = &self.app_state.notifications;

        let items = notifications
            .list_for_user(caller.id)
            .await
            .map_err(Self::to_status)?;
        let unread_count = notifications
            .unread_count(caller.id)
            .await
            .map_err(Self::to_status)?;

        let now = Utc::now().naive_utc();
        Ok(Response::new(NotificationListResponse {
            notifications: items
                .into_iter()
                .map(|n| NotificationResponse {
                    id: n.id.to_string(),
                    relative_time: rules::relative_time(n.created_at, now),
                    message: n.message,
                    created_at: n.created_at.and_utc().timestamp(),
                    read: n.read,
                })
                .collect(),
            unread_count,
        }))
    }

    async fn mark_notifications_read(
        &self,
        request: Request<MarkNotificationsReadRequest>,
    ) -> Result<Response<MarkNotificationsReadResponse>, Status> {
        let caller = self.caller(&request).await?;

        let updated = self
            .app_state
            .notifications
            .mark_all_read(caller.id)
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(MarkNotificationsReadResponse {
            updated: i64::try_from(updated).unwrap_or(i64::MAX),
        }))
    }

    async fn get_dashboard(
        &self,
        request: Request<GetDashboardRequest>,
    ) -> Result<Response<DashboardResponse>, Status> {
        let caller = self.caller(&request).await?;
        auth::require_admin(&caller).map_err(Self::to_status)?;

        let dashboard = self
            .app_state
            .analytics
            .dashboard()
            .await
            .map_err(Self::to_status)?;

        Ok(Response::new(DashboardResponse {
            total_equbs: dashboard.total_equbs,
            total_members: dashboard.total_members,
            active_cycles: dashboard.active_cycles,
            total_contributions: Self::money(dashboard.total_contributions),
            equbs_by_status: dashboard
                .equbs_by_status
                .into_iter()
                .map(|(status, count)| NamedAmount {
                    name: status.as_str().to_string(),
                    value: count.to_string(),
                })
                .collect(),
            contributions_by_type: dashboard
                .contributions_by_type
                .into_iter()
                .map(|(equb_type, total)| NamedAmount {
                    name: equb_type.as_str().to_string(),
                    value: Self::money(total),
                })
                .collect(),
        }))
    }

    async fn get_advice(
        &self,
        request: Request<AdviceRequest>,
    ) -> Result<Response<AdviceResponse>, Status> {
        let caller = self.caller(&request).await?;
        auth::require_admin(&caller).map_err(Self::to_status)?;

        let advice = self
            .app_state
            .advisor
            .advise(&request.into_inner().prompt)
            .await
            .map_err(Self::to_status)?;
        Ok(Response::new(AdviceResponse { advice }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AppError::NotFound("x".into()), tonic::Code::NotFound),
            (AppError::Unauthorized("x".into()), tonic::Code::Unauthenticated),
            (AppError::Forbidden("x".into()), tonic::Code::PermissionDenied),
            (AppError::Validation("x".into()), tonic::Code::InvalidArgument),
            (AppError::BusinessLogic("x".into()), tonic::Code::FailedPrecondition),
            (AppError::ExternalService("x".into()), tonic::Code::Unavailable),
            (AppError::Message("x".into()), tonic::Code::Internal),
        ];
        for (err, code) in cases {
            assert_eq!(EqubGrpcService::to_status(err).code(), code);
        }
    }

    #[test]
    fn test_money_has_two_decimal_places() {
        assert_eq!(EqubGrpcService::money(Decimal::new(1000, 0)), "1000.00");
        assert_eq!(EqubGrpcService::money(Decimal::new(75050, 2)), "750.50");
        assert_eq!(EqubGrpcService::money(Decimal::new(12346, 3)), "12.35");
        assert_eq!(EqubGrpcService::money(Decimal::ZERO), "0.00");
    }

    #[test]
    fn test_equb_input_parsing() {
        let input = proto::EqubInput {
            name: "Piassa Fridge".to_string(),
            equb_type: "Fridge".to_string(),
            contribution_amount: "750.50".to_string(),
            cycle: "monthly".to_string(),
            max_members: 6,
            status: String::new(),
            start_date: "2024-01-31".to_string(),
            next_due_date: String::new(),
        };

        let parsed = EqubGrpcService::equb_input(input.clone()).unwrap();
        assert_eq!(parsed.equb_type, EqubType::Fridge);
        assert_eq!(parsed.contribution_amount, Decimal::new(75050, 2));
        assert!(parsed.status.is_none());
        assert!(parsed.next_due_date.is_none());

        let bad_date = proto::EqubInput {
            start_date: "31/01/2024".to_string(),
            ..input
        };
        let err = EqubGrpcService::equb_input(bad_date).unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }
}
