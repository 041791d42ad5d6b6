//! Solidity contract ABI bindings for the YO gateway, ERC20 tokens
//! and WETH on Base.

use alloy::sol;

sol! {
    #![sol(all_derives = true)]
    interface IYoGateway {
        function deposit(
            address yoVault,
            uint256 assets,
            uint256 minSharesOut,
            address receiver,
            uint32 partnerId
        ) external returns (uint256 sharesOut);

        function redeem(
            address yoVault,
            uint256 shares,
            uint256 minAssetsOut,
            address receiver,
            uint32 partnerId
        ) external returns (uint256 assetsOrRequestId);

        function quoteConvertToShares(address yoVault, uint256 assets)
            external view returns (uint256 shares);

        function quoteConvertToAssets(address yoVault, uint256 shares)
            external view returns (uint256 assets);

        function getAssetAllowance(address yoVault, address owner)
            external view returns (uint256);

        function getShareAllowance(address yoVault, address owner)
            external view returns (uint256);
    }
}

sol! {
    #![sol(all_derives = true)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

sol! {
    #![sol(all_derives = true)]
    interface IWETH {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
    }
}
